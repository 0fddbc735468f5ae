use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Asset, ExchangeError, Result};
use crate::utils::math::checked_add;

/// Holdings of one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub eth: Amount,
    pub token: Amount,
}

impl Balance {
    pub fn get(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Eth => self.eth,
            Asset::Token => self.token,
        }
    }

    fn slot(&mut self, asset: Asset) -> &mut Amount {
        match asset {
            Asset::Eth => &mut self.eth,
            Asset::Token => &mut self.token,
        }
    }
}

/// What an operation takes from and pays to its caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    pub debit_eth: Amount,
    pub debit_token: Amount,
    pub credit_eth: Amount,
    pub credit_token: Amount,
}

impl Transfer {
    pub fn pay(eth: Amount, token: Amount) -> Self {
        Self {
            debit_eth: eth,
            debit_token: token,
            ..Self::default()
        }
    }

    pub fn receive(eth: Amount, token: Amount) -> Self {
        Self {
            credit_eth: eth,
            credit_token: token,
            ..Self::default()
        }
    }

    pub fn exchange(asset_in: Asset, amount_in: Amount, amount_out: Amount) -> Self {
        match asset_in {
            Asset::Eth => Self {
                debit_eth: amount_in,
                credit_token: amount_out,
                ..Self::default()
            },
            Asset::Token => Self {
                debit_token: amount_in,
                credit_eth: amount_out,
                ..Self::default()
            },
        }
    }
}

/// ETH and token balances of every account outside the pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountBook {
    balances: HashMap<Address, Balance>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account from outside the exchange (faucet, token mint).
    pub fn deposit(&mut self, account: &Address, asset: Asset, amount: Amount) -> Result<Amount> {
        let mut balance = self.balance(account);
        let slot = balance.slot(asset);
        *slot = checked_add(*slot, amount)?;
        let updated = *slot;
        self.balances.insert(account.clone(), balance);
        Ok(updated)
    }

    pub fn balance(&self, account: &Address) -> Balance {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn balance_of(&self, account: &Address, asset: Asset) -> Amount {
        self.balance(account).get(asset)
    }

    /// Balance after `transfer`, without applying it.
    pub fn plan(&self, account: &Address, transfer: &Transfer) -> Result<Balance> {
        let mut balance = self.balance(account);

        for (asset, debit) in [(Asset::Eth, transfer.debit_eth), (Asset::Token, transfer.debit_token)] {
            let slot = balance.slot(asset);
            let available = *slot;
            *slot = available.checked_sub(debit).ok_or_else(|| ExchangeError::InsufficientBalance {
                account: account.clone(),
                asset,
                requested: debit,
                available,
            })?;
        }
        for (asset, credit) in [(Asset::Eth, transfer.credit_eth), (Asset::Token, transfer.credit_token)] {
            let slot = balance.slot(asset);
            *slot = checked_add(*slot, credit)?;
        }

        Ok(balance)
    }

    pub fn commit(&mut self, account: &Address, balance: Balance) {
        self.balances.insert(account.clone(), balance);
    }
}
