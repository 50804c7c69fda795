use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use config_manager::AmountDenomination;
use pnl_core::{PnLError, PriceTable, Trade, TradeSide};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Trade record as it appears in the input files
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrade {
    pub address: String,
    pub token: String,
    pub mode: String,
    pub token_amount: Decimal,
    pub base_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Converts raw amounts into base-currency units
#[derive(Debug, Clone, Copy)]
pub struct AmountScale {
    factor: Decimal,
}

impl AmountScale {
    pub fn new(denomination: AmountDenomination, decimals: u32) -> Self {
        let factor = match denomination {
            AmountDenomination::Base => Decimal::ONE,
            AmountDenomination::Smallest => Decimal::new(1, decimals),
        };
        Self { factor }
    }

    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount * self.factor
    }
}

impl RawTrade {
    pub fn into_trade(self, scale: AmountScale) -> pnl_core::Result<Trade> {
        let side = self.mode.parse::<TradeSide>().map_err(|_| PnLError::Validation {
            field: "mode",
            reason: format!("expected 'buy' or 'sell', got '{}'", self.mode),
        })?;

        let trade = Trade::new(
            self.address.trim(),
            self.token.trim(),
            side,
            self.token_amount,
            scale.apply(self.base_amount),
            self.created_at,
        );
        trade.validate()?;
        Ok(trade)
    }
}

/// Parse raw records from CSV text (header row required)
pub fn parse_trades_csv(content: &str) -> Result<Vec<RawTrade>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize()
        .enumerate()
        .map(|(index, record)| record.with_context(|| format!("Invalid CSV trade record #{}", index + 1)))
        .collect()
}

pub fn parse_trades_json(content: &str) -> Result<Vec<RawTrade>> {
    serde_json::from_str(content).context("Invalid JSON trade list")
}

/// Validate, scale and sort raw records into engine trades.
///
/// The sort is stable so same-timestamp trades keep their file order.
pub fn prepare_trades(raw: Vec<RawTrade>, scale: AmountScale) -> Result<Vec<Trade>> {
    let mut trades = raw
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_trade(scale)
                .with_context(|| format!("Rejected trade record #{}", index + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    trades.sort_by_key(|trade| trade.timestamp);
    debug!("Prepared {} trades", trades.len());
    Ok(trades)
}

/// Parse a `token -> price` JSON object, scaling prices into base units
pub fn parse_prices(content: &str, scale: AmountScale) -> Result<PriceTable> {
    let raw: BTreeMap<String, Decimal> =
        serde_json::from_str(content).context("Invalid JSON price table")?;

    let mut table = PriceTable::with_capacity(raw.len());
    for (token, price) in raw {
        if price <= Decimal::ZERO {
            warn!("Price for {} is {}, its holdings will be valued at 0", token, price);
        }
        table.insert(token.trim().to_string(), scale.apply(price));
    }
    Ok(table)
}

pub async fn load_trades(path: &Path, scale: AmountScale) -> Result<Vec<Trade>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read trades from {}", path.display()))?;

    let raw = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => parse_trades_csv(&content)?,
        _ => parse_trades_json(&content)?,
    };
    info!("Loaded {} trade records from {}", raw.len(), path.display());

    prepare_trades(raw, scale)
}

pub async fn load_prices(path: &Path, scale: AmountScale) -> Result<PriceTable> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prices from {}", path.display()))?;

    let table = parse_prices(&content, scale)?;
    info!("Loaded {} token prices from {}", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sats() -> AmountScale {
        AmountScale::new(AmountDenomination::Smallest, 8)
    }

    #[test]
    fn test_csv_records_are_scaled_and_sorted() {
        let content = "\
address,token,mode,token_amount,base_amount,created_at
bc1qa, DOG ,sell,500,150000,2025-03-02T00:00:00Z
bc1qa,DOG,buy,1000,100000,2025-03-01T00:00:00Z
";
        let trades = prepare_trades(parse_trades_csv(content).unwrap(), sats()).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].base_amount, dec!(0.001));
        assert_eq!(trades[1].token, "DOG");
        assert_eq!(trades[1].base_amount, dec!(0.0015));
    }

    #[test]
    fn test_json_records_accept_numbers_and_strings() {
        let content = r#"[
            {"address": "bc1qb", "token": "PUPS", "mode": "BUY", "token_amount": 12, "base_amount": "0.25", "created_at": "2025-01-01T10:00:00Z"}
        ]"#;
        let scale = AmountScale::new(AmountDenomination::Base, 8);

        let trades = prepare_trades(parse_trades_json(content).unwrap(), scale).unwrap();

        assert_eq!(trades[0].token_amount, dec!(12));
        assert_eq!(trades[0].base_amount, dec!(0.25));
        assert_eq!(trades[0].side, TradeSide::Buy);
    }

    #[test]
    fn test_rejects_unknown_mode_naming_field() {
        let raw = RawTrade {
            address: "bc1qc".to_string(),
            token: "DOG".to_string(),
            mode: "transfer".to_string(),
            token_amount: dec!(1),
            base_amount: dec!(1),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        match raw.into_trade(sats()) {
            Err(PnLError::Validation { field, .. }) => assert_eq!(field, "mode"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let content = r#"[
            {"address": "bc1qd", "token": "DOG", "mode": "sell", "token_amount": 0, "base_amount": 10, "created_at": "2025-01-01T10:00:00Z"}
        ]"#;

        let err = prepare_trades(parse_trades_json(content).unwrap(), sats()).unwrap_err();
        let validation = err.downcast_ref::<PnLError>().expect("validation error");
        assert!(matches!(validation, PnLError::Validation { field: "token_amount", .. }));
    }

    #[test]
    fn test_prices_scaled_into_base_units() {
        let table = parse_prices(r#"{"DOG": 2, "PUPS": "0"}"#, sats()).unwrap();

        assert_eq!(table["DOG"], dec!(0.00000002));
        assert_eq!(table["PUPS"], Decimal::ZERO);
    }
}
