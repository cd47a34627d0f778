//! riskguard: risk and position management core for autonomous trading
//!
//! This library provides the core components for:
//! - Position ledger with account state and an append-only journal
//! - Pre-trade risk validation against configured limits
//! - Portfolio risk metrics and reporting
//! - Position monitoring with stop/target/time exits and a global stop
//! - Market regime detection over an OHLCV window
//! - Adaptive strategy parameter control
//! - Signal sizing and execution pipeline with a pluggable safety gate
//! - Emergency stop gate
//! - Full observability stack

pub mod adaptive;
pub mod cli;
pub mod config;
pub mod engine;
pub mod journal;
pub mod ledger;
pub mod monitor;
pub mod pipeline;
pub mod regime;
pub mod risk;
pub mod telemetry;
