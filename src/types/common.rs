use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ExchangeError;

/// Quantity of either asset, in its smallest unit (wei for ETH).
pub type Amount = u128;
pub type Timestamp = u64;

pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as u64
}

// ============================================================================
// Assets
// ============================================================================

/// The two sides of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Eth,
    Token,
}

impl Asset {
    pub fn other(&self) -> Asset {
        match self {
            Asset::Eth => Asset::Token,
            Asset::Token => Asset::Eth,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Asset::Eth => "ETH",
            Asset::Token => "token",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Addresses
// ============================================================================

/// Account identity of a trader or liquidity provider.
///
/// Stored lowercase so that mixed-case input maps to the same provider record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ExchangeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| ExchangeError::Parse(format!("address '{}' must start with 0x", s)))?;

        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ExchangeError::Parse(format!("invalid address '{}'", s)));
        }

        Ok(Address::new(s))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(id: &str) -> Self {
        Address::new(id)
    }
}
