use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An open buy position waiting to be consumed by sells
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lot {
    /// Token quantity still held from this buy
    pub amount: Decimal,

    /// Base-currency cost per token, fixed at purchase time
    pub unit_cost: Decimal,
}

impl Lot {
    pub fn new(amount: Decimal, unit_cost: Decimal) -> Self {
        Self { amount, unit_cost }
    }

    pub fn cost_basis(&self) -> Decimal {
        self.amount * self.unit_cost
    }
}

/// Open lots of one token for one address, oldest first.
///
/// Exhausted lots are popped from the front, so a lot with zero amount is never observable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LotQueue {
    lots: VecDeque<Lot>,
}

impl LotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lot created by a buy. Non-positive amounts are ignored.
    pub fn push(&mut self, lot: Lot) {
        if lot.amount > Decimal::ZERO {
            self.lots.push_back(lot);
        }
    }

    pub fn front(&self) -> Option<&Lot> {
        self.lots.front()
    }

    /// Take up to `amount` tokens from the oldest lot.
    ///
    /// Returns the consumed quantity together with that lot's unit cost; the lot is removed
    /// once nothing is left in it.
    pub fn consume_front(&mut self, amount: Decimal) -> Option<(Decimal, Decimal)> {
        let lot = self.lots.front_mut()?;
        let unit_cost = lot.unit_cost;

        if lot.amount > amount {
            lot.amount -= amount;
            Some((amount, unit_cost))
        } else {
            let consumed = lot.amount;
            self.lots.pop_front();
            Some((consumed, unit_cost))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn total_amount(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.amount).sum()
    }

    pub fn total_cost_basis(&self) -> Decimal {
        self.lots.iter().map(Lot::cost_basis).sum()
    }
}
