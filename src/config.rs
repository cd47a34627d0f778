//! Configuration types for riskguard

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

use crate::adaptive::{AdaptationSpeed, StrategyParameters};
use crate::monitor::MonitorConfig;
use crate::regime::RegimeConfig;
use crate::risk::RiskLimits;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub limits: RiskLimits,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub adaptation: AdaptationConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub regime: RegimeSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Account and persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Starting balance for a fresh session
    pub initial_balance: Decimal,
    /// Journal file; omitted disables persistence
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}

/// Strategy parameter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_strategy_name")]
    pub name: String,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,
    #[serde(default = "default_risk_per_trade_pct")]
    pub risk_per_trade_pct: Decimal,
    #[serde(default = "default_max_position_size_pct")]
    pub max_position_size_pct: Decimal,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
}

fn default_strategy_name() -> String {
    "default".to_string()
}
fn default_min_confidence() -> Decimal {
    Decimal::new(6, 1) // 0.6
}
fn default_risk_per_trade_pct() -> Decimal {
    Decimal::ONE
}
fn default_max_position_size_pct() -> Decimal {
    Decimal::TEN
}
fn default_stop_loss_pct() -> Decimal {
    Decimal::TWO
}
fn default_take_profit_pct() -> Decimal {
    Decimal::from(4)
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: default_strategy_name(),
            min_confidence: default_min_confidence(),
            risk_per_trade_pct: default_risk_per_trade_pct(),
            max_position_size_pct: default_max_position_size_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
        }
    }
}

impl StrategyConfig {
    /// Build the initial parameter bundle from configuration
    pub fn to_parameters(&self) -> StrategyParameters {
        let mut params = StrategyParameters::defaults_for(self.name.clone())
            .with_min_confidence(self.min_confidence)
            .with_protective_levels(self.stop_loss_pct, self.take_profit_pct)
            .with_risk_per_trade(self.risk_per_trade_pct);
        params.max_position_size_pct = self.max_position_size_pct;
        params
    }
}

/// Adaptation controller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptationConfig {
    #[serde(default = "default_speed")]
    pub speed: AdaptationSpeed,
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_speed() -> AdaptationSpeed {
    AdaptationSpeed::Medium
}
fn default_strength() -> f64 {
    0.5
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            strength: default_strength(),
        }
    }
}

/// Monitor loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_price_timeout_ms")]
    pub price_timeout_ms: u64,
}

fn default_tick_interval_secs() -> u64 {
    5
}
fn default_price_timeout_ms() -> u64 {
    2_000
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            price_timeout_ms: default_price_timeout_ms(),
        }
    }
}

impl MonitorSettings {
    /// Convert to the monitor's runtime configuration
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            tick_interval_secs: self.tick_interval_secs,
            price_timeout_ms: self.price_timeout_ms,
        }
    }
}

/// Regime detector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeSettings {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_candle_interval_secs")]
    pub candle_interval_secs: u64,
}

fn default_window() -> usize {
    200
}
fn default_candle_interval_secs() -> u64 {
    60
}

impl Default for RegimeSettings {
    fn default() -> Self {
        Self {
            window: default_window(),
            candle_interval_secs: default_candle_interval_secs(),
        }
    }
}

impl RegimeSettings {
    /// Convert to the detector's runtime configuration
    pub fn to_regime_config(&self) -> RegimeConfig {
        RegimeConfig {
            window: self.window,
            candle_interval_secs: self.candle_interval_secs,
            ..RegimeConfig::default()
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; 0 disables the exporter
    #[serde(default)]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: crate::telemetry::LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_level: default_log_level(),
            log_format: crate::telemetry::LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimal_config() {
        let toml = r#"
            [account]
            initial_balance = 10000
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.account.initial_balance, dec!(10000));
        assert_eq!(config.limits, RiskLimits::default());
        assert_eq!(config.strategy.min_confidence, dec!(0.6));
        assert_eq!(config.monitor.tick_interval_secs, 5);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [account]
            initial_balance = 50000
            journal_path = "./data/journal.jsonl"

            [limits]
            max_daily_loss_pct = 3.0
            max_daily_trades = 15
            max_position_size_pct = 8.0
            max_open_positions = 4
            max_correlation_exposure_pct = 25.0
            stop_loss_pct = 1.5
            global_stop_loss_pct = 9.0
            max_volatility_exposure = 0.7
            max_hold_secs = 43200
            cooldown_after_loss_secs = 900

            [strategy]
            name = "momentum"
            min_confidence = 0.7
            risk_per_trade_pct = 0.5

            [adaptation]
            speed = "fast"
            strength = 0.7

            [monitor]
            tick_interval_secs = 2
            price_timeout_ms = 500

            [regime]
            window = 120
            candle_interval_secs = 300

            [telemetry]
            metrics_port = 9090
            log_level = "debug"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.limits.max_daily_trades, 15);
        assert_eq!(config.adaptation.speed, AdaptationSpeed::Fast);
        assert_eq!(config.regime.candle_interval_secs, 300);
        assert_eq!(config.telemetry.metrics_port, 9090);

        let params = config.strategy.to_parameters();
        assert_eq!(params.strategy, "momentum");
        assert_eq!(params.min_confidence, dec!(0.7));
        assert_eq!(params.risk_per_trade_pct, dec!(0.5));
    }
}
