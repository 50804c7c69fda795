use anyhow::{Context, Result};
use chrono::Utc;
use config_manager::SystemConfig;
use pnl_core::{leaderboard::generate_leaderboard_summary, summarize, ReportAggregator, TrailingWindow};
use std::path::Path;
use tracing::info;

mod export;
mod input;

use export::{generate_leaderboard_csv, generate_reports_json};
use input::{load_prices, load_trades, AmountScale};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SystemConfig::load_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let default_filter = if config.system.debug_mode {
        "debug".to_string()
    } else {
        config.system.log_filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("Starting leaderboard run...");

    let scale = AmountScale::new(config.input.amount_denomination, config.base_currency.decimals);
    let trades = load_trades(Path::new(&config.input.trades_path), scale).await?;
    let prices = load_prices(Path::new(&config.input.prices_path), scale).await?;

    let aggregator = ReportAggregator::new(
        TrailingWindow::parse(&config.windows.recent)?,
        TrailingWindow::parse(&config.windows.trailing)?,
    );
    let reports = aggregator.build_reports(&trades, &prices, Utc::now());

    let summary = summarize(&reports);
    info!(
        "\n{}",
        generate_leaderboard_summary(&summary, &config.base_currency.symbol)
    );

    let csv = generate_leaderboard_csv(&reports, &config.base_currency.symbol)?;
    tokio::fs::write(&config.output.csv_path, csv)
        .await
        .with_context(|| format!("Failed to write {}", config.output.csv_path))?;
    info!("Leaderboard CSV written to {}", config.output.csv_path);

    if let Some(json_path) = &config.output.json_path {
        let json = generate_reports_json(&summary, &reports)?;
        tokio::fs::write(json_path, json)
            .await
            .with_context(|| format!("Failed to write {}", json_path))?;
        info!("Full reports written to {}", json_path);
    }

    info!("Leaderboard run completed for {} addresses", reports.len());
    Ok(())
}
