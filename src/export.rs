use anyhow::{Context, Result};
use csv::Writer;
use pnl_core::{AddressReport, LeaderboardSummary};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::io::Cursor;

/// Fixed-point text with half-away-from-zero rounding
fn fixed(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

/// Generate the leaderboard CSV, one row per report in the given order
pub fn generate_leaderboard_csv(reports: &[AddressReport], symbol: &str) -> Result<String> {
    let mut wtr = Writer::from_writer(Cursor::new(Vec::new()));

    let volume_header = format!("Total Volume ({})", symbol);
    wtr.write_record([
        "Address",
        "Profit %",
        "APR",
        "30-day Profit %",
        "Trades",
        volume_header.as_str(),
    ])
    .context("CSV header error")?;

    for report in reports {
        let row = vec![
            report.address.clone(),
            fixed(report.profit_percent(), 2),
            fixed(report.apr, 2),
            report
                .profit_30d
                .map(|p| fixed(p, 2))
                .unwrap_or_else(|| "N/A".to_string()),
            report.trade_count().to_string(),
            fixed(report.total_volume, 4),
        ];

        wtr.write_record(&row).context("CSV write error")?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV finalization error: {}", e))?
        .into_inner();

    String::from_utf8(data).context("CSV encoding error")
}

#[derive(Serialize)]
struct LeaderboardDump<'a> {
    summary: &'a LeaderboardSummary,
    reports: &'a [AddressReport],
}

/// Full reports plus summary as pretty JSON
pub fn generate_reports_json(summary: &LeaderboardSummary, reports: &[AddressReport]) -> Result<String> {
    serde_json::to_string_pretty(&LeaderboardDump { summary, reports }).context("JSON encoding error")
}
