use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Asset, Timestamp, now};

/// State change notification, produced only after an operation commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ExchangeEvent {
    PoolCreated {
        admin: Address,
        amount_eth: Amount,
        amount_token: Amount,
        shares: Amount,
    },
    AddLiquidity {
        from: Address,
        amount: Amount,
    },
    RemoveLiquidity {
        to: Address,
        amount_eth: Amount,
        amount_token: Amount,
    },
    Received {
        from: Address,
        amount_eth: Amount,
    },
    Swap {
        trader: Address,
        asset_in: Asset,
        amount_in: Amount,
        amount_out: Amount,
        fee: Amount,
    },
    FeesReinvested {
        amount_eth: Amount,
        amount_token: Amount,
    },
    FeeDistributed {
        asset: Asset,
        amount: Amount,
    },
}

impl ExchangeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ExchangeEvent::PoolCreated { .. } => "PoolCreated",
            ExchangeEvent::AddLiquidity { .. } => "AddLiquidity",
            ExchangeEvent::RemoveLiquidity { .. } => "RemoveLiquidity",
            ExchangeEvent::Received { .. } => "Received",
            ExchangeEvent::Swap { .. } => "Swap",
            ExchangeEvent::FeesReinvested { .. } => "FeesReinvested",
            ExchangeEvent::FeeDistributed { .. } => "FeeDistributed",
        }
    }
}

/// Event with its position in the exchange's commit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub event: ExchangeEvent,
}

impl EventRecord {
    pub fn new(sequence: u64, event: ExchangeEvent) -> Self {
        Self {
            sequence,
            timestamp: now(),
            event,
        }
    }
}
