use clap::Parser;
use riskguard::cli::{Cli, Commands};
use riskguard::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    let _guard = riskguard::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(feed = %args.feed.display(), "starting replay");
            args.execute(&config).await?;
        }
        Commands::Report(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Initial balance: {}", config.account.initial_balance);
            println!(
                "  Journal: {}",
                config
                    .account
                    .journal_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "disabled".to_string())
            );
            println!(
                "  Limits: daily loss {}%, trades/day {}, position {}%, open {}",
                config.limits.max_daily_loss_pct,
                config.limits.max_daily_trades,
                config.limits.max_position_size_pct,
                config.limits.max_open_positions
            );
            println!(
                "  Strategy: {} (min confidence {}, risk/trade {}%)",
                config.strategy.name,
                config.strategy.min_confidence,
                config.strategy.risk_per_trade_pct
            );
            println!(
                "  Adaptation: {:?} at strength {}",
                config.adaptation.speed, config.adaptation.strength
            );
        }
    }

    Ok(())
}
