use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{fifo_matcher::SellMatch, ledger::AddressLedger, valuation::unrealized_profit, PriceTable, Trade};

/// Return on committed capital, in percent. Zero when nothing was committed.
pub fn profit_percent(realized: Decimal, unrealized: Decimal, cost_basis: Decimal) -> Decimal {
    if cost_basis > Decimal::ZERO {
        (realized + unrealized) / cost_basis * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// P&L position of one address over one window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfitSnapshot {
    pub realized_profit: Decimal,
    pub unrealized_profit: Decimal,
    pub total_cost_basis: Decimal,
    pub profit_percent: Decimal,
}

impl ProfitSnapshot {
    pub fn new(realized_profit: Decimal, unrealized_profit: Decimal, total_cost_basis: Decimal) -> Self {
        Self {
            realized_profit,
            unrealized_profit,
            total_cost_basis,
            profit_percent: profit_percent(realized_profit, unrealized_profit, total_cost_basis),
        }
    }

    /// Mark a finished ledger to `prices`
    pub fn from_ledger(ledger: &AddressLedger, prices: &PriceTable) -> Self {
        Self::new(
            ledger.realized_profit,
            unrealized_profit(&ledger.holdings, prices),
            ledger.total_cost_basis,
        )
    }

    pub fn total_profit(&self) -> Decimal {
        self.realized_profit + self.unrealized_profit
    }

    pub fn has_cost_basis(&self) -> bool {
        self.total_cost_basis > Decimal::ZERO
    }
}

/// One point of the profit chart
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProfitPoint {
    pub time: DateTime<Utc>,
    pub profit_percent: Decimal,
}

/// Profit percent after each trade, valued at today's prices.
///
/// Replays the trades lazily; clone it (or build a new one) to walk the series again.
#[derive(Debug, Clone)]
pub struct ProfitHistory<'a> {
    trades: std::slice::Iter<'a, Trade>,
    prices: &'a PriceTable,
    ledger: AddressLedger,
}

impl<'a> ProfitHistory<'a> {
    pub fn new(trades: &'a [Trade], prices: &'a PriceTable) -> Self {
        Self {
            trades: trades.iter(),
            prices,
            ledger: AddressLedger::new(),
        }
    }

    /// Apply the next trade, returning its sell match alongside the new point
    pub fn step(&mut self) -> Option<(Option<SellMatch>, ProfitPoint)> {
        let trade = self.trades.next()?;
        let outcome = self.ledger.apply(trade);

        let snapshot = ProfitSnapshot::from_ledger(&self.ledger, self.prices);
        Some((
            outcome,
            ProfitPoint {
                time: trade.timestamp,
                profit_percent: snapshot.profit_percent,
            },
        ))
    }

    /// Ledger state after the trades consumed so far
    pub fn into_ledger(self) -> AddressLedger {
        self.ledger
    }
}

impl Iterator for ProfitHistory<'_> {
    type Item = ProfitPoint;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().map(|(_, point)| point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.trades.size_hint()
    }
}

impl ExactSizeIterator for ProfitHistory<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TradeSide;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_profit_percent_zero_cost_basis() {
        assert_eq!(profit_percent(dec!(5), dec!(1), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(profit_percent(dec!(5), dec!(1), dec!(12)), dec!(50));
    }

    #[test]
    fn test_history_uses_current_prices_for_every_point() {
        let trades = vec![
            Trade::new("a", "DOG", TradeSide::Buy, dec!(10), dec!(10), at(0)),
            Trade::new("a", "DOG", TradeSide::Sell, dec!(5), dec!(15), at(60)),
        ];
        let prices = PriceTable::from([("DOG".to_string(), dec!(2))]);

        let history: Vec<ProfitPoint> = ProfitHistory::new(&trades, &prices).collect();

        assert_eq!(history.len(), 2);
        // After the buy: 10 lots marked at 2 against cost 1 => +100%
        assert_eq!(history[0].time, at(0));
        assert_eq!(history[0].profit_percent, dec!(100));
        // After the sell: realized 5 × (3 − 1) = 10, unrealized 5 × (2 − 1) = 5 => 150%
        assert_eq!(history[1].time, at(60));
        assert_eq!(history[1].profit_percent, dec!(150));
    }

    #[test]
    fn test_step_carries_sell_match_and_final_ledger() {
        let trades = vec![
            Trade::new("a", "DOG", TradeSide::Buy, dec!(10), dec!(10), at(0)),
            Trade::new("a", "DOG", TradeSide::Sell, dec!(5), dec!(15), at(60)),
        ];
        let prices = PriceTable::from([("DOG".to_string(), dec!(2))]);
        let mut history = ProfitHistory::new(&trades, &prices);

        let (buy, _) = history.step().expect("buy step");
        let (sell, point) = history.step().expect("sell step");

        assert!(buy.is_none());
        let sell = sell.expect("sell match");
        assert_eq!(sell.realized_profit, dec!(10));
        assert_eq!(sell.profit_percent, dec!(200));
        assert_eq!(point.profit_percent, dec!(150));
        assert!(history.step().is_none());
        assert_eq!(history.into_ledger().open_amount("DOG"), dec!(5));
    }

    #[test]
    fn test_history_is_restartable() {
        let trades = vec![Trade::new("a", "DOG", TradeSide::Buy, dec!(4), dec!(8), at(0))];
        let prices = PriceTable::new();

        let history = ProfitHistory::new(&trades, &prices);
        let first: Vec<_> = history.clone().collect();
        let second: Vec<_> = history.collect();

        assert_eq!(first, second);
        assert_eq!(first[0].profit_percent, Decimal::ZERO);
    }
}
