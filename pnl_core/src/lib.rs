pub mod fifo_matcher;
pub mod leaderboard;
pub mod ledger;
pub mod lot_queue;
pub mod report;
pub mod snapshot;
pub mod timeframe;
pub mod valuation;

pub use fifo_matcher::{match_sell, SellMatch};
pub use leaderboard::{summarize, LeaderboardStats, LeaderboardSummary, TopTrader};
pub use ledger::{AddressLedger, LedgerBuilder, LedgerReplay};
pub use lot_queue::{Lot, LotQueue};
pub use report::{AddressReport, ReportAggregator};
pub use snapshot::{profit_percent, ProfitHistory, ProfitPoint, ProfitSnapshot};
pub use timeframe::{parse_general_timeframe, slice_window, TrailingWindow};
pub use valuation::{unrealized_profit, Valuation};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PnLError {
    #[error("Invalid trade field `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("Timeframe parsing error: {0}")]
    TimeframeParse(String),
}

pub type Result<T> = std::result::Result<T, PnLError>;

/// Current unit price per token symbol, in base-currency units.
pub type PriceTable = HashMap<String, Decimal>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::str::FromStr for TradeSide {
    type Err = PnLError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(PnLError::Validation {
                field: "side",
                reason: format!("unknown trade side '{}'", other),
            }),
        }
    }
}

/// A single swap of a token against the base currency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Wallet address that performed the trade
    pub address: String,

    /// Token symbol (e.g. a rune ticker)
    pub token: String,

    pub side: TradeSide,

    /// Amount of tokens bought or sold, always positive
    pub token_amount: Decimal,

    /// Base-currency amount paid or received, always positive
    pub base_amount: Decimal,

    pub timestamp: DateTime<Utc>,

    /// Realized profit percent of a sell, attached by the report aggregator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_percent: Option<Decimal>,
}

impl Trade {
    pub fn new(
        address: impl Into<String>,
        token: impl Into<String>,
        side: TradeSide,
        token_amount: Decimal,
        base_amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
            side,
            token_amount,
            base_amount,
            timestamp,
            profit_percent: None,
        }
    }

    /// Base-currency price of one token unit
    pub fn unit_price(&self) -> Decimal {
        if self.token_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.base_amount / self.token_amount
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == TradeSide::Buy
    }

    /// Reject records the engine cannot account for.
    ///
    /// The engine itself never calls this; upstream loaders do before handing trades over.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(PnLError::Validation {
                field: "address",
                reason: "address is empty".to_string(),
            });
        }
        if self.token.trim().is_empty() {
            return Err(PnLError::Validation {
                field: "token",
                reason: "token symbol is empty".to_string(),
            });
        }
        if self.token_amount <= Decimal::ZERO {
            return Err(PnLError::Validation {
                field: "token_amount",
                reason: format!("must be positive, got {}", self.token_amount),
            });
        }
        if self.base_amount <= Decimal::ZERO {
            return Err(PnLError::Validation {
                field: "base_amount",
                reason: format!("must be positive, got {}", self.base_amount),
            });
        }
        Ok(())
    }
}
