use config::{Config, ConfigError, Environment, File};
use pnl_core::parse_general_timeframe;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Where trades and prices are read from
    pub input: InputConfig,

    /// Base currency the trades are settled in
    pub base_currency: BaseCurrencyConfig,

    /// Trailing windows used for recent performance
    pub windows: WindowConfig,

    /// Export destinations
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Enable debug mode
    pub debug_mode: bool,

    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

/// Unit in which raw base-currency amounts and prices are expressed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AmountDenomination {
    /// Already in base units (e.g. BTC)
    Base,
    /// Smallest on-chain unit (e.g. satoshi), scaled by `base_currency.decimals`
    Smallest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Trade records, `.csv` or `.json`
    pub trades_path: String,

    /// JSON object mapping token symbol to current unit price
    pub prices_path: String,

    pub amount_denomination: AmountDenomination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseCurrencyConfig {
    pub symbol: String,

    /// Number of smallest units per base unit, as a power of ten
    pub decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Recent window, general timeframe syntax (e.g. "30d")
    pub recent: String,

    /// Trailing window, general timeframe syntax (e.g. "365d")
    pub trailing: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Leaderboard CSV destination
    pub csv_path: String,

    /// Full reports as JSON (skipped when unset)
    pub json_path: Option<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings {
                debug_mode: false,
                log_filter: "info".to_string(),
            },
            input: InputConfig {
                trades_path: "data/trades.json".to_string(),
                prices_path: "data/prices.json".to_string(),
                amount_denomination: AmountDenomination::Smallest,
            },
            base_currency: BaseCurrencyConfig {
                symbol: "BTC".to_string(),
                decimals: 8,
            },
            windows: WindowConfig {
                recent: "30d".to_string(),
                trailing: "365d".to_string(),
            },
            output: OutputConfig {
                csv_path: "leaderboard.csv".to_string(),
                json_path: None,
            },
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trades_path.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Trades path is required".to_string(),
            ));
        }

        if self.prices_path.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Prices path is required".to_string(),
            ));
        }

        Ok(())
    }
}

impl BaseCurrencyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Base currency symbol cannot be empty".to_string(),
            ));
        }

        // Decimal supports at most 28 fractional digits; 18 covers every mainstream chain
        if self.decimals > 18 {
            return Err(ConfigurationError::InvalidValue(format!(
                "Base currency decimals must be at most 18, got {}",
                self.decimals
            )));
        }

        Ok(())
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        validate_timeframe("windows.recent", &self.recent)?;
        validate_timeframe("windows.trailing", &self.trailing)
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.csv_path.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "CSV output path is required".to_string(),
            ));
        }

        if matches!(&self.json_path, Some(path) if path.trim().is_empty()) {
            return Err(ConfigurationError::InvalidValue(
                "JSON output path cannot be empty when set".to_string(),
            ));
        }

        Ok(())
    }
}

/// Check a window against the general timeframe syntax `<number><s|min|h|d|m|y>` and the
/// supported date range
pub fn validate_timeframe(key: &str, value: &str) -> Result<()> {
    parse_general_timeframe(value).map_err(|e| {
        ConfigurationError::InvalidValue(format!(
            "{} must look like '30d' or '1y', got '{}' ({})",
            key, value, e
        ))
    })?;

    Ok(())
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // e.g. LEADERBOARD__OUTPUT__CSV_PATH=out.csv
        config_builder = config_builder.add_source(
            Environment::with_prefix("LEADERBOARD")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );

        let system_config: SystemConfig = config_builder.build()?.try_deserialize()?;

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.input.validate()?;
        self.base_currency.validate()?;
        self.windows.validate()?;
        self.output.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.windows.recent, "30d");
        assert_eq!(config.windows.trailing, "365d");
        assert_eq!(config.base_currency.decimals, 8);
        assert_eq!(config.input.amount_denomination, AmountDenomination::Smallest);
    }

    #[test]
    fn test_rejects_bad_window() {
        let mut config = SystemConfig::default();
        config.windows.recent = "thirty days".to_string();

        match config.validate() {
            Err(ConfigurationError::InvalidValue(message)) => {
                assert!(message.contains("windows.recent"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_window_beyond_date_range() {
        let mut config = SystemConfig::default();
        config.windows.trailing = "300000y".to_string();

        match config.validate() {
            Err(ConfigurationError::InvalidValue(message)) => {
                assert!(message.contains("windows.trailing"))
            }
            other => panic!("unexpected result: {:?}", other),
        }

        config.windows.trailing = "100y".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_excessive_decimals_and_empty_paths() {
        let mut config = SystemConfig::default();
        config.base_currency.decimals = 30;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.output.csv_path = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.output.json_path = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("leaderboard-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[input]
trades_path = "fixtures/swaps.csv"
amount_denomination = "base"

[windows]
recent = "1m"

[output]
csv_path = "out/board.csv"
json_path = "out/board.json"
"#,
        )
        .unwrap();

        let config = SystemConfig::load_from_path(&path).unwrap();

        assert_eq!(config.input.trades_path, "fixtures/swaps.csv");
        assert_eq!(config.input.prices_path, "data/prices.json");
        assert_eq!(config.input.amount_denomination, AmountDenomination::Base);
        assert_eq!(config.windows.recent, "1m");
        assert_eq!(config.windows.trailing, "365d");
        assert_eq!(config.output.json_path.as_deref(), Some("out/board.json"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
