//! Report command implementation
//!
//! Rebuilds the ledger from the journal and prints the risk report.

use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::journal::Journal;
use crate::ledger::Ledger;
use crate::risk::{RiskMetrics, DEFAULT_VOLATILITY_WINDOW};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Journal file to replay; defaults to the configured path
    #[arg(short, long)]
    pub journal: Option<PathBuf>,
}

impl ReportArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let path = self
            .journal
            .clone()
            .or_else(|| config.account.journal_path.clone())
            .ok_or_else(|| anyhow::anyhow!("no journal path given and none configured"))?;

        let records = Journal::replay(&path)?;
        let record_count = records.len();
        let ledger = Ledger::from_records(
            config.account.initial_balance,
            config.limits.clone(),
            records,
        )?;

        let snapshot = ledger.snapshot();
        let metrics = RiskMetrics::calculate(
            &snapshot,
            ledger.closed(),
            ledger.limits(),
            DEFAULT_VOLATILITY_WINDOW,
        );

        println!("Risk report ({} journal records)", record_count);
        println!("  Balance:        {}", snapshot.account.balance);
        println!("  Initial:        {}", snapshot.account.initial_balance);
        println!("  Daily P&L:      {}", snapshot.account.daily_pnl);
        println!("  Daily trades:   {}", snapshot.account.daily_trades);
        println!("  Emergency stop: {}", snapshot.account.emergency_stopped);
        println!("  Open positions: {}", metrics.open_positions);
        println!("  Closed trades:  {}", ledger.closed().len());
        println!("  Exposure:       {}%", metrics.exposure_pct);
        println!("  Win rate:       {}", metrics.win_rate);
        println!("  Max drawdown:   {}%", metrics.max_drawdown_pct);
        println!("  Volatility:     {}", metrics.volatility);
        println!("  Risk level:     {:?}", metrics.risk_level);

        for position in &snapshot.open_positions {
            println!(
                "  open {} {} {:?} qty {} entry {} stop {} target {}",
                position.id,
                position.symbol,
                position.direction,
                position.quantity,
                position.entry_price,
                position.stop_loss,
                position.take_profit
            );
        }
        Ok(())
    }
}
