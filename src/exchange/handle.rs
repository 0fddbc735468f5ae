use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::event::EventSink;
use crate::exchange::service::{Exchange, LiquidityReceipt, SwapReceipt};
use crate::pool::Reinvestment;
use crate::types::{Address, Amount, Asset, PoolSnapshot, RateBound, Result};

/// Shared access to one [`Exchange`] from concurrent tasks.
///
/// Every operation runs to completion under a single lock, so two swaps can
/// never interleave against the same reserves. Events are published after
/// the lock is released and reach the sink in `sequence` order.
pub struct ExchangeHandle<S: EventSink> {
    exchange: Arc<Mutex<Exchange>>,
    /// Held while publishing; taken before the exchange lock is released
    publish_turn: Arc<Mutex<()>>,
    sink: Arc<S>,
}

impl<S: EventSink> Clone for ExchangeHandle<S> {
    fn clone(&self) -> Self {
        Self {
            exchange: self.exchange.clone(),
            publish_turn: self.publish_turn.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<S: EventSink> ExchangeHandle<S> {
    pub fn new(exchange: Exchange, sink: S) -> Self {
        Self {
            exchange: Arc::new(Mutex::new(exchange)),
            publish_turn: Arc::new(Mutex::new(())),
            sink: Arc::new(sink),
        }
    }

    /// Run one operation under the lock, then publish what it committed.
    ///
    /// The operation has already committed when publishing runs, so a sink
    /// failure is logged rather than returned.
    pub async fn execute<T>(&self, op: impl FnOnce(&mut Exchange) -> Result<T>) -> Result<T> {
        let (result, events, turn) = {
            let mut exchange = self.exchange.lock().await;
            let result = op(&mut exchange);
            let events = exchange.drain_events();
            // The next operation cannot drain until it holds the exchange
            // lock, and cannot publish until this turn is released
            let turn = self.publish_turn.lock().await;
            (result, events, turn)
        };

        for record in events {
            let sequence = record.sequence;
            if let Err(e) = self.sink.publish(record).await {
                warn!(sequence, error = %e, "failed to publish event");
            }
        }
        drop(turn);

        result
    }

    /// Read-only access under the same lock
    pub async fn read<T>(&self, view: impl FnOnce(&Exchange) -> T) -> T {
        let exchange = self.exchange.lock().await;
        view(&exchange)
    }

    pub async fn create_pool(&self, caller: &Address, token_amount: Amount, eth_amount: Amount) -> Result<Amount> {
        self.execute(|ex| ex.create_pool(caller, token_amount, eth_amount)).await
    }

    pub async fn add_liquidity(
        &self,
        caller: &Address,
        eth_amount: Amount,
        max_rate: RateBound,
        min_rate: RateBound,
    ) -> Result<LiquidityReceipt> {
        self.execute(|ex| ex.add_liquidity(caller, eth_amount, max_rate, min_rate))
            .await
    }

    pub async fn remove_liquidity(
        &self,
        caller: &Address,
        eth_amount: Amount,
        max_rate: RateBound,
        min_rate: RateBound,
    ) -> Result<LiquidityReceipt> {
        self.execute(|ex| ex.remove_liquidity(caller, eth_amount, max_rate, min_rate))
            .await
    }

    pub async fn remove_all_liquidity(&self, caller: &Address) -> Result<LiquidityReceipt> {
        self.execute(|ex| ex.remove_all_liquidity(caller)).await
    }

    pub async fn swap_eth_for_tokens(&self, caller: &Address, eth_amount: Amount, max_rate: RateBound) -> Result<SwapReceipt> {
        self.execute(|ex| ex.swap_eth_for_tokens(caller, eth_amount, max_rate)).await
    }

    pub async fn swap_tokens_for_eth(
        &self,
        caller: &Address,
        token_amount: Amount,
        max_rate: RateBound,
    ) -> Result<SwapReceipt> {
        self.execute(|ex| ex.swap_tokens_for_eth(caller, token_amount, max_rate))
            .await
    }

    pub async fn reinvest_fee_to_pool(&self, caller: &Address) -> Result<Reinvestment> {
        self.execute(|ex| ex.reinvest_fee_to_pool(caller)).await
    }

    pub async fn distribute_eth_fee(&self, caller: &Address, fee: Amount) -> Result<()> {
        self.execute(|ex| ex.distribute_eth_fee(caller, fee)).await
    }

    pub async fn distribute_token_fee(&self, caller: &Address, fee: Amount) -> Result<()> {
        self.execute(|ex| ex.distribute_token_fee(caller, fee)).await
    }

    pub async fn deposit(&self, account: &Address, asset: Asset, amount: Amount) -> Result<Amount> {
        self.execute(|ex| ex.deposit(account, asset, amount)).await
    }

    pub async fn balance_of(&self, account: &Address, asset: Asset) -> Amount {
        self.read(|ex| ex.balance_of(account, asset)).await
    }

    pub async fn snapshot(&self) -> PoolSnapshot {
        self.read(|ex| ex.snapshot()).await
    }
}
