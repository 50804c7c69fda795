use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    fifo_matcher::{match_sell, SellMatch},
    lot_queue::{Lot, LotQueue},
    snapshot::{ProfitHistory, ProfitPoint, ProfitSnapshot},
    PriceTable, Trade, TradeSide,
};

/// Running FIFO state of one address over one window.
///
/// Built fresh for every replay; windows never share lots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressLedger {
    /// Realized profit of all sells so far, in base currency
    pub realized_profit: Decimal,

    /// Base currency committed through buys
    pub total_cost_basis: Decimal,

    /// Open lots per token symbol
    pub holdings: BTreeMap<String, LotQueue>,
}

impl AddressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one trade. Sells report how they were matched.
    pub fn apply(&mut self, trade: &Trade) -> Option<SellMatch> {
        match trade.side {
            TradeSide::Buy => {
                self.holdings
                    .entry(trade.token.clone())
                    .or_default()
                    .push(Lot::new(trade.token_amount, trade.unit_price()));
                self.total_cost_basis += trade.base_amount;

                debug!(
                    "Recorded buy: {} {} @ {} (costBasis now={})",
                    trade.token_amount,
                    trade.token,
                    trade.unit_price(),
                    self.total_cost_basis
                );
                None
            }
            TradeSide::Sell => {
                let queue = self.holdings.entry(trade.token.clone()).or_default();
                let outcome = match_sell(queue, trade.token_amount, trade.unit_price());
                self.realized_profit += outcome.realized_profit;

                if outcome.is_oversold() {
                    warn!(
                        "Address {} sold {} {} beyond tracked inventory at {}; residual booked at zero cost basis",
                        trade.address, outcome.unmatched_amount, trade.token, trade.timestamp
                    );
                }

                debug!(
                    "Recorded sell: {} {} @ {} => realized={}, percent={}",
                    trade.token_amount,
                    trade.token,
                    trade.unit_price(),
                    outcome.realized_profit,
                    outcome.profit_percent
                );
                Some(outcome)
            }
        }
    }

    pub fn open_amount(&self, token: &str) -> Decimal {
        self.holdings
            .get(token)
            .map(LotQueue::total_amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn snapshot(&self, prices: &PriceTable) -> ProfitSnapshot {
        ProfitSnapshot::from_ledger(self, prices)
    }
}

/// Everything one replay produced
#[derive(Debug, Clone)]
pub struct LedgerReplay {
    pub ledger: AddressLedger,

    /// Present only when history was requested
    pub history: Option<Vec<ProfitPoint>>,

    /// Index-aligned with the replayed trades; `None` for buys
    pub sell_matches: Vec<Option<SellMatch>>,
}

impl LedgerReplay {
    pub fn snapshot(&self, prices: &PriceTable) -> ProfitSnapshot {
        self.ledger.snapshot(prices)
    }
}

/// Replays an address's trades through the FIFO matcher against one price table
#[derive(Debug, Clone, Copy)]
pub struct LedgerBuilder<'a> {
    prices: &'a PriceTable,
}

impl<'a> LedgerBuilder<'a> {
    pub fn new(prices: &'a PriceTable) -> Self {
        Self { prices }
    }

    /// Replay `trades` in the given order; they must already be sorted by timestamp.
    ///
    /// With history, the replay is driven by [`ProfitHistory`] and collects every point.
    pub fn replay(&self, trades: &[Trade], with_history: bool) -> LedgerReplay {
        let mut sell_matches = Vec::with_capacity(trades.len());

        if !with_history {
            let mut ledger = AddressLedger::new();
            for trade in trades {
                sell_matches.push(ledger.apply(trade));
            }
            return LedgerReplay {
                ledger,
                history: None,
                sell_matches,
            };
        }

        let mut steps = ProfitHistory::new(trades, self.prices);
        let mut points = Vec::with_capacity(trades.len());
        while let Some((outcome, point)) = steps.step() {
            sell_matches.push(outcome);
            points.push(point);
        }

        LedgerReplay {
            ledger: steps.into_ledger(),
            history: Some(points),
            sell_matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn trade(token: &str, side: TradeSide, amount: Decimal, base: Decimal, secs: i64) -> Trade {
        Trade::new("bc1qledger", token, side, amount, base, at(secs))
    }

    #[test]
    fn test_buy_only_history() {
        let trades = vec![
            trade("DOG", TradeSide::Buy, dec!(10), dec!(20), 0),
            trade("PUPS", TradeSide::Buy, dec!(4), dec!(4), 10),
        ];
        let prices = PriceTable::from([
            ("DOG".to_string(), dec!(3)),
            ("PUPS".to_string(), dec!(0.5)),
        ]);

        let replay = LedgerBuilder::new(&prices).replay(&trades, false);
        let snapshot = replay.snapshot(&prices);

        assert_eq!(snapshot.realized_profit, Decimal::ZERO);
        assert_eq!(snapshot.total_cost_basis, dec!(24));
        // valuation 30 + 2 = 32 minus cost basis 24
        assert_eq!(snapshot.unrealized_profit, dec!(8));
        assert!(replay.history.is_none());
        assert!(replay.sell_matches.iter().all(Option::is_none));
    }

    #[test]
    fn test_tokens_have_separate_queues() {
        let trades = vec![
            trade("DOG", TradeSide::Buy, dec!(2), dec!(20), 0),
            trade("PUPS", TradeSide::Buy, dec!(2), dec!(2), 1),
            trade("PUPS", TradeSide::Sell, dec!(1), dec!(3), 2),
        ];
        let prices = PriceTable::new();

        let replay = LedgerBuilder::new(&prices).replay(&trades, false);

        assert_eq!(replay.ledger.open_amount("DOG"), dec!(2));
        assert_eq!(replay.ledger.open_amount("PUPS"), dec!(1));
        assert_eq!(replay.ledger.realized_profit, dec!(2));
        let sell = replay.sell_matches[2].expect("sell outcome");
        assert_eq!(sell.profit_percent, dec!(200));
    }

    #[test]
    fn test_history_matches_lazy_series() {
        let trades = vec![
            trade("DOG", TradeSide::Buy, dec!(2), dec!(20), 0),
            trade("DOG", TradeSide::Buy, dec!(3), dec!(60), 5),
            trade("DOG", TradeSide::Sell, dec!(4), dec!(100), 9),
        ];
        let prices = PriceTable::from([("DOG".to_string(), dec!(30))]);

        let replay = LedgerBuilder::new(&prices).replay(&trades, true);
        let eager = replay.history.expect("history requested");
        let lazy: Vec<_> = ProfitHistory::new(&trades, &prices).collect();

        assert_eq!(eager, lazy);
        assert_eq!(eager.len(), 3);
        // final: realized 2×15 + 2×5 = 40, unrealized 1×10, cost basis 80 => 62.5%
        assert_eq!(eager[2].profit_percent, dec!(62.5));
        assert_eq!(replay.ledger.holdings["DOG"].front(), Some(&Lot::new(dec!(1), dec!(20))));
    }
}
