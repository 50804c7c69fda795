use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::lot_queue::LotQueue;

/// Outcome of closing one sell against a lot queue
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SellMatch {
    /// Realized profit of this sell, including any zero-cost residual
    pub realized_profit: Decimal,

    /// Cost basis of the lot portions that were consumed
    pub cost_basis: Decimal,

    /// Quantity covered by open lots
    pub matched_amount: Decimal,

    /// Quantity sold beyond the tracked inventory
    pub unmatched_amount: Decimal,

    /// `(sell price / average matched cost − 1) × 100`, averaged over the full sell amount
    pub profit_percent: Decimal,
}

impl SellMatch {
    pub fn is_oversold(&self) -> bool {
        self.unmatched_amount > Decimal::ZERO
    }
}

/// Close `amount` tokens sold at `unit_sell_price` against the oldest lots first.
///
/// Whatever the queue cannot cover is booked at zero cost basis, so the whole sale value of
/// the residual becomes realized profit. Zero amounts and empty queues are no-ops.
pub fn match_sell(queue: &mut LotQueue, amount: Decimal, unit_sell_price: Decimal) -> SellMatch {
    let mut remains = amount;
    let mut outcome = SellMatch::default();

    if amount <= Decimal::ZERO {
        debug!("Sell amount {} is not positive => skipping", amount);
        return outcome;
    }

    while remains > Decimal::ZERO {
        let Some((consumed, unit_cost)) = queue.consume_front(remains) else {
            break;
        };

        let profit = (unit_sell_price - unit_cost) * consumed;
        outcome.realized_profit += profit;
        outcome.cost_basis += unit_cost * consumed;
        outcome.matched_amount += consumed;
        remains -= consumed;

        trace!(
            "FIFO-ITER: consumed={}, unitCost={}, profit={}, remains={}",
            consumed,
            unit_cost,
            profit,
            remains
        );
    }

    if remains > Decimal::ZERO {
        outcome.unmatched_amount = remains;
        outcome.realized_profit += unit_sell_price * remains;
        debug!(
            "Sell exceeds open lots by {} => booking {} at zero cost basis",
            remains,
            unit_sell_price * remains
        );
    }

    if outcome.cost_basis > Decimal::ZERO {
        let average_cost = outcome.cost_basis / amount;
        outcome.profit_percent = (unit_sell_price / average_cost - Decimal::ONE) * Decimal::ONE_HUNDRED;
    }

    outcome
}
