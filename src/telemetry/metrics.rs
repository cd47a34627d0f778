//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Price source fetch latency
    PriceFetch,
    /// Monitor tick duration
    MonitorTick,
    /// Signal processing latency
    SignalProcessing,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current account balance
    Equity,
    /// Realized P&L since the daily boundary
    DailyPnl,
    /// Drawdown percentage from initial balance
    DrawdownPct,
    /// Aggregate exposure percentage
    ExposurePct,
    /// Open position count
    OpenPositions,
    /// Win rate over closed history
    WinRate,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let name = match metric {
        LatencyMetric::PriceFetch => "riskguard_price_fetch_latency_ms",
        LatencyMetric::MonitorTick => "riskguard_monitor_tick_latency_ms",
        LatencyMetric::SignalProcessing => "riskguard_signal_processing_latency_ms",
    };
    metrics::histogram!(name).record(duration.as_millis() as f64);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::Equity => "riskguard_equity",
        GaugeMetric::DailyPnl => "riskguard_daily_pnl",
        GaugeMetric::DrawdownPct => "riskguard_drawdown_pct",
        GaugeMetric::ExposurePct => "riskguard_exposure_pct",
        GaugeMetric::OpenPositions => "riskguard_open_positions",
        GaugeMetric::WinRate => "riskguard_win_rate",
    };
    metrics::gauge!(name).set(value);
}
