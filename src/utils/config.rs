use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::pool::{DEFAULT_FEE_BIPS, FeePolicy};
use crate::types::{ExchangeError, Result};
use crate::utils::math::BIPS_DENOMINATOR;

pub const DEFAULT_CONFIG_PATH: &str = "exchange.toml";

/// Exchange configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pool identity and seeding
    pub pool: PoolConfig,

    /// Swap fee settings
    pub fees: FeeConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Pool identity and the seed amounts used by the demo binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub exchange_name: String,
    pub token_symbol: String,
    /// Tokens and wei deposited at pool creation
    pub initial_supply: u64,
    /// Amount the demo trader is funded with, per asset
    pub trader_funding: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            exchange_name: "DEX for brothers".into(),
            token_symbol: "BRO".into(),
            initial_supply: 10_000_000_000,
            trader_funding: 1_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Swap fee in basis points
    pub fee_bips: u32,

    pub policy: FeePolicy,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_bips: DEFAULT_FEE_BIPS,
            policy: FeePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Write every committed event to the log
    pub log_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_events: true,
        }
    }
}

impl Config {
    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool
    }

    pub fn fee_config(&self) -> &FeeConfig {
        &self.fees
    }

    pub fn logging_config(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Load config from file or use defaults, then apply `.env` and
    /// environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides looked up by variable name
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(fee_bips) = lookup("EXCHANGE_FEE_BIPS") {
            self.fees.fee_bips = fee_bips
                .trim()
                .parse()
                .map_err(|_| ExchangeError::Config(format!("EXCHANGE_FEE_BIPS is not a number: {}", fee_bips)))?;
        }

        if let Some(policy) = lookup("EXCHANGE_FEE_POLICY") {
            self.fees.policy = policy.parse()?;
        }

        if let Some(level) = lookup("EXCHANGE_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if u128::from(self.fees.fee_bips) >= BIPS_DENOMINATOR {
            return Err(ExchangeError::Config(format!(
                "fee_bips must be below {}, got {}",
                BIPS_DENOMINATOR, self.fees.fee_bips
            )));
        }

        if self.pool.initial_supply == 0 {
            return Err(ExchangeError::Config("initial_supply must be greater than zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fee_config().fee_bips, 30);
        assert_eq!(config.fee_config().policy, FeePolicy::ReinvestOnPair);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [fees]
            fee_bips = 0
            policy = "manual"
            "#,
        )
        .unwrap();

        assert_eq!(config.fees.fee_bips, 0);
        assert_eq!(config.fees.policy, FeePolicy::Manual);
        assert_eq!(config.pool.initial_supply, 10_000_000_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(Config::from_toml("[fees]\nfee_bips = \"lots\""), Err(ExchangeError::Toml(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("EXCHANGE_FEE_BIPS", "5"),
            ("EXCHANGE_FEE_POLICY", "manual"),
            ("EXCHANGE_LOG_LEVEL", "debug"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.fees.fee_bips, 5);
        assert_eq!(config.fees.policy, FeePolicy::Manual);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| (key == "EXCHANGE_FEE_BIPS").then(|| "abc".to_string()));
        assert!(matches!(result, Err(ExchangeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_full_fee() {
        let mut config = Config::default();
        config.fees.fee_bips = 10_000;
        assert!(config.validate().is_err());
    }
}
