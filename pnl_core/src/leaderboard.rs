use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{report::AddressReport, TradeSide};

/// Aggregate figures across every address on the board
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardStats {
    pub total_traders: usize,

    /// Sum of every address's buy volume, in base units
    pub total_volume: Decimal,

    /// Mean all-time profit percent
    pub average_profit_percent: Decimal,
}

/// Highlight of the best performing address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopTrader {
    pub address: String,
    pub profit_percent: Decimal,
    pub trade_count: usize,
    pub total_volume: Decimal,

    /// Token with the most base currency traded through it, buys and sells together
    pub top_token: Option<String>,
    pub top_token_volume: Decimal,

    /// Profitable sells as a share of all trades, in percent
    pub win_rate: Decimal,

    /// Mean base amount per trade
    pub average_trade_size: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardSummary {
    pub stats: LeaderboardStats,
    pub top_trader: Option<TopTrader>,
}

pub fn leaderboard_stats(reports: &[AddressReport]) -> LeaderboardStats {
    let total_traders = reports.len();
    let total_volume = reports.iter().map(|r| r.total_volume).sum();
    let average_profit_percent = if total_traders > 0 {
        reports.iter().map(AddressReport::profit_percent).sum::<Decimal>() / Decimal::from(total_traders)
    } else {
        Decimal::ZERO
    };

    LeaderboardStats {
        total_traders,
        total_volume,
        average_profit_percent,
    }
}

/// Pick the address with the highest all-time percent; earlier reports win ties.
pub fn top_trader(reports: &[AddressReport]) -> Option<TopTrader> {
    let best = reports.iter().fold(None::<&AddressReport>, |best, report| match best {
        Some(current) if report.profit_percent() <= current.profit_percent() => Some(current),
        _ => Some(report),
    })?;

    let mut top_token = None;
    let mut top_token_volume = Decimal::ZERO;
    for (token, trades) in &best.trades_by_token {
        let volume: Decimal = trades.iter().map(|t| t.base_amount).sum();
        if volume > top_token_volume {
            top_token = Some(token.clone());
            top_token_volume = volume;
        }
    }

    let trade_count = best.trade_count();
    let profitable_sells = best
        .trades
        .iter()
        .filter(|t| t.side == TradeSide::Sell)
        .filter(|t| t.profit_percent.is_some_and(|p| p > Decimal::ZERO))
        .count();

    let (win_rate, average_trade_size) = if trade_count > 0 {
        let traded: Decimal = best.trades.iter().map(|t| t.base_amount).sum();
        (
            Decimal::from(profitable_sells) / Decimal::from(trade_count) * Decimal::ONE_HUNDRED,
            traded / Decimal::from(trade_count),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    debug!(
        "Top trader {}: {}% over {} trades, top token {:?}",
        best.address,
        best.profit_percent(),
        trade_count,
        top_token
    );

    Some(TopTrader {
        address: best.address.clone(),
        profit_percent: best.profit_percent(),
        trade_count,
        total_volume: best.total_volume,
        top_token,
        top_token_volume,
        win_rate,
        average_trade_size,
    })
}

pub fn summarize(reports: &[AddressReport]) -> LeaderboardSummary {
    LeaderboardSummary {
        stats: leaderboard_stats(reports),
        top_trader: top_trader(reports),
    }
}

/// Human-readable digest for logs
pub fn generate_leaderboard_summary(summary: &LeaderboardSummary, symbol: &str) -> String {
    let stats = &summary.stats;
    let mut text = format!(
        "🏆 LEADERBOARD SUMMARY\nTraders: {} | Volume: {:.4} {} | Avg Profit: {:.2}%\n",
        stats.total_traders, stats.total_volume, symbol, stats.average_profit_percent
    );

    match &summary.top_trader {
        Some(top) => text.push_str(&format!(
            "Top trader {} | Profit: {:.2}% | Trades: {} | Volume: {:.4} {} | Top token: {} ({:.4} {}) | Win rate: {:.2}% | Avg trade: {:.4} {}\n",
            top.address,
            top.profit_percent,
            top.trade_count,
            top.total_volume,
            symbol,
            top.top_token.as_deref().unwrap_or("N/A"),
            top.top_token_volume,
            symbol,
            top.win_rate,
            top.average_trade_size,
            symbol
        )),
        None => text.push_str("No traders found.\n"),
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{report::ReportAggregator, PriceTable, Trade};
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn trade(address: &str, token: &str, side: TradeSide, amount: Decimal, base: Decimal, days_ago: i64) -> Trade {
        Trade::new(address, token, side, amount, base, now() - Duration::days(days_ago))
    }

    fn reports() -> Vec<AddressReport> {
        let trades = vec![
            trade("alice", "DOG", TradeSide::Buy, dec!(10), dec!(1), 9),
            trade("bob", "PUPS", TradeSide::Buy, dec!(4), dec!(2), 8),
            trade("alice", "PIZZA", TradeSide::Buy, dec!(1), dec!(0.5), 7),
            trade("alice", "DOG", TradeSide::Sell, dec!(5), dec!(1.5), 6),
            trade("alice", "DOG", TradeSide::Sell, dec!(5), dec!(0.25), 5),
        ];
        let prices = PriceTable::from([("PUPS".to_string(), dec!(0.25))]);
        ReportAggregator::default().build_reports(&trades, &prices, now())
    }

    #[test]
    fn test_stats() {
        let reports = reports();
        let stats = leaderboard_stats(&reports);

        assert_eq!(stats.total_traders, 2);
        assert_eq!(stats.total_volume, dec!(3.5));
        // alice: realized (1.5 − 0.5) + (0.25 − 0.5) = 0.75 on 1.5 => 50%; bob: −1 on 2 => −50%
        assert_eq!(stats.average_profit_percent, Decimal::ZERO);
    }

    #[test]
    fn test_top_trader() {
        let top = top_trader(&reports()).expect("top trader");

        assert_eq!(top.address, "alice");
        assert_eq!(top.profit_percent, dec!(50));
        assert_eq!(top.trade_count, 4);
        assert_eq!(top.top_token.as_deref(), Some("DOG"));
        assert_eq!(top.top_token_volume, dec!(2.75));
        // one profitable sell out of four trades
        assert_eq!(top.win_rate, dec!(25));
        assert_eq!(top.average_trade_size, dec!(0.8125));
    }

    #[test]
    fn test_empty_board() {
        let summary = summarize(&[]);

        assert_eq!(summary.stats, LeaderboardStats::default());
        assert!(summary.top_trader.is_none());
        assert!(generate_leaderboard_summary(&summary, "BTC").contains("No traders found"));
    }
}
