use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{
    fifo_matcher::SellMatch,
    ledger::LedgerBuilder,
    snapshot::{ProfitPoint, ProfitSnapshot},
    timeframe::TrailingWindow,
    valuation::value_open_lots,
    PriceTable, Trade,
};

const MONTHS_PER_YEAR: u32 = 12;

/// Final P&L report for one address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressReport {
    pub address: String,

    /// All-time position
    pub all_time: ProfitSnapshot,

    /// All-time profit percent after each trade
    pub profit_history: Vec<ProfitPoint>,

    /// Profit percent over the recent window; `None` when nothing was bought in it
    pub profit_30d: Option<Decimal>,

    /// Profit percent over the trailing window; zero when nothing was bought in it
    pub profit_12m: Decimal,

    /// Annualized return estimate
    pub apr: Decimal,

    /// Base-currency amount spent on buys
    pub total_volume: Decimal,

    /// Every trade of the address, sells annotated with their realized percent
    pub trades: Vec<Trade>,

    pub trades_by_token: BTreeMap<String, Vec<Trade>>,
}

impl AddressReport {
    pub fn profit_percent(&self) -> Decimal {
        self.all_time.profit_percent
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// `max(profit_30d × 12, profit_12m)` when the recent window saw buys, else `profit_12m`
pub fn annualized_return(profit_30d: Option<Decimal>, profit_12m: Decimal) -> Decimal {
    match profit_30d {
        Some(recent) => (recent * Decimal::from(MONTHS_PER_YEAR)).max(profit_12m),
        None => profit_12m,
    }
}

/// Base-currency amount spent on buys
pub fn buy_volume(trades: &[Trade]) -> Decimal {
    trades
        .iter()
        .filter(|trade| trade.is_buy())
        .map(|trade| trade.base_amount)
        .sum()
}

/// Group trades by address, keeping each address's trades in input order
pub fn group_by_address(trades: &[Trade]) -> BTreeMap<String, Vec<Trade>> {
    let mut groups: BTreeMap<String, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups
            .entry(trade.address.clone())
            .or_default()
            .push(trade.clone());
    }
    groups
}

/// Set the percent of every sell at `positions` from the replay that matched it
fn attach_sell_percents(trades: &mut [Trade], positions: &[usize], matches: &[Option<SellMatch>]) {
    for (&position, outcome) in positions.iter().zip(matches) {
        if let (Some(trade), Some(sell)) = (trades.get_mut(position), outcome) {
            trade.profit_percent = Some(sell.profit_percent);
        }
    }
}

fn group_by_token(trades: &[Trade]) -> BTreeMap<String, Vec<Trade>> {
    let mut groups: BTreeMap<String, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups
            .entry(trade.token.clone())
            .or_default()
            .push(trade.clone());
    }
    groups
}

/// Runs the all-time, recent and trailing replays for every address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportAggregator {
    recent: TrailingWindow,
    trailing: TrailingWindow,
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self {
            recent: TrailingWindow::THIRTY_DAYS,
            trailing: TrailingWindow::TWELVE_MONTHS,
        }
    }
}

impl ReportAggregator {
    pub fn new(recent: TrailingWindow, trailing: TrailingWindow) -> Self {
        Self { recent, trailing }
    }

    /// Build one report per address, ordered by address.
    ///
    /// `trades` must be sorted ascending by timestamp.
    pub fn build_reports(&self, trades: &[Trade], prices: &PriceTable, now: DateTime<Utc>) -> Vec<AddressReport> {
        let start_time = std::time::Instant::now();
        let by_address = group_by_address(trades);

        info!(
            "Building P&L reports for {} addresses from {} trades ({} priced tokens)",
            by_address.len(),
            trades.len(),
            prices.len()
        );

        let reports: Vec<AddressReport> = by_address
            .into_iter()
            .map(|(address, address_trades)| self.build_address_report(address, address_trades, prices, now))
            .collect();

        info!(
            "P&L reports completed for {} addresses in {:.3}s",
            reports.len(),
            start_time.elapsed().as_secs_f64()
        );

        reports
    }

    /// Build the report of a single address from its sorted trades
    pub fn build_address_report(
        &self,
        address: String,
        mut trades: Vec<Trade>,
        prices: &PriceTable,
        now: DateTime<Utc>,
    ) -> AddressReport {
        let builder = LedgerBuilder::new(prices);

        let all_time_replay = builder.replay(&trades, true);
        let all_time = all_time_replay.snapshot(prices);

        let unpriced = value_open_lots(&all_time_replay.ledger.holdings, prices).unpriced_tokens;
        if !unpriced.is_empty() {
            warn!(
                "Address {} holds open lots without a current price: {:?} (valued at 0)",
                address, unpriced
            );
        }

        let all_positions: Vec<usize> = (0..trades.len()).collect();
        attach_sell_percents(&mut trades, &all_positions, &all_time_replay.sell_matches);

        // Window replays overwrite the percents of the sells they contain; the trailing one runs last
        let recent = Self::replay_window(builder, self.recent, &mut trades, prices, now);
        let trailing = Self::replay_window(builder, self.trailing, &mut trades, prices, now);

        let profit_30d = recent.has_cost_basis().then_some(recent.profit_percent);
        let profit_12m = trailing.profit_percent;
        let apr = annualized_return(profit_30d, profit_12m);

        debug!(
            "Address {}: allTime={}%, 30d={:?}, 12m={}%, apr={}%",
            address, all_time.profit_percent, profit_30d, profit_12m, apr
        );

        AddressReport {
            total_volume: buy_volume(&trades),
            trades_by_token: group_by_token(&trades),
            profit_history: all_time_replay.history.unwrap_or_default(),
            address,
            all_time,
            profit_30d,
            profit_12m,
            apr,
            trades,
        }
    }

    fn replay_window(
        builder: LedgerBuilder<'_>,
        window: TrailingWindow,
        trades: &mut [Trade],
        prices: &PriceTable,
        now: DateTime<Utc>,
    ) -> ProfitSnapshot {
        let (positions, window_trades) = window.slice_indexed(trades, now);
        let replay = builder.replay(&window_trades, false);
        attach_sell_percents(trades, &positions, &replay.sell_matches);
        replay.snapshot(prices)
    }
}
