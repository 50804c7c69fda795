use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::{lot_queue::LotQueue, PriceTable};

/// Mark-to-market result for a set of open lots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valuation {
    pub unrealized_profit: Decimal,

    /// Tokens holding open lots that had no usable price
    pub unpriced_tokens: Vec<String>,
}

/// Value every open lot at the current price: `(price − unit cost) × amount`.
///
/// Tokens without a price, or with a zero/negative one, contribute nothing.
pub fn value_open_lots(holdings: &BTreeMap<String, LotQueue>, prices: &PriceTable) -> Valuation {
    let mut valuation = Valuation::default();

    for (token, queue) in holdings {
        if queue.is_empty() {
            continue;
        }

        match prices.get(token).copied().filter(|price| *price > Decimal::ZERO) {
            Some(price) => {
                valuation.unrealized_profit += queue
                    .iter()
                    .map(|lot| (price - lot.unit_cost) * lot.amount)
                    .sum::<Decimal>();
            }
            None => {
                debug!("No current price for {} => unrealized P&L contribution = 0", token);
                valuation.unpriced_tokens.push(token.clone());
            }
        }
    }

    valuation
}

/// Shorthand for [`value_open_lots`] when only the figure matters
pub fn unrealized_profit(holdings: &BTreeMap<String, LotQueue>, prices: &PriceTable) -> Decimal {
    value_open_lots(holdings, prices).unrealized_profit
}
