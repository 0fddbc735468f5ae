use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::{debug, info, warn};

use crate::exchange::accounts::{AccountBook, Balance, Transfer};
use crate::pool::{
    Direction, FeeDistributor, FeePolicy, FeeStructure, LiquidityLedger, PoolPhase, PoolState, Reinvestment, ShareBurn,
    ShareMint,
};
use crate::swap::{SwapEngine, SwapQuote};
use crate::types::{
    Address, Amount, Asset, EventRecord, ExchangeError, ExchangeEvent, PoolSnapshot, Rate, RateBound, Result, now,
};
use crate::utils::config::FeeConfig;
use crate::utils::math::{Rounding, bips_to_percent, mul_div};

/// Shares and amounts moved by a liquidity operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityReceipt {
    pub shares: Amount,
    pub amount_eth: Amount,
    pub amount_token: Amount,
}

/// Executed swap and any fee reinvestment it triggered
#[derive(Debug, Clone)]
pub struct SwapReceipt {
    pub quote: SwapQuote,
    pub reinvested: Option<Reinvestment>,
}

impl SwapReceipt {
    pub fn amount_out(&self) -> Amount {
        self.quote.amount_out
    }
}

/// Every change an operation makes, computed against the current state and
/// applied in one step by [`Exchange::commit`].
struct Plan {
    pool: PoolState,
    fees: FeeDistributor,
    mint: Option<ShareMint>,
    burn: Option<ShareBurn>,
    account: Option<(Address, Balance)>,
    admin: Option<Address>,
    events: Vec<ExchangeEvent>,
}

/// Single ETH/token constant-product exchange.
///
/// Each mutating operation plans against `&self`, so a rejected operation
/// cannot leave a partial change behind; the plan is committed only when
/// every step succeeded. Events are queued after the commit and collected
/// with [`drain_events`](Self::drain_events).
#[derive(Debug, Clone)]
pub struct Exchange {
    pool: PoolState,
    ledger: LiquidityLedger,
    fees: FeeDistributor,
    engine: SwapEngine,
    accounts: AccountBook,
    admin: Option<Address>,
    sequence: u64,
    outbox: Vec<EventRecord>,
}

impl Exchange {
    pub fn new(fees: FeeStructure, policy: FeePolicy) -> Self {
        Self {
            pool: PoolState::new(),
            ledger: LiquidityLedger::new(),
            fees: FeeDistributor::new(policy),
            engine: SwapEngine::new(fees),
            accounts: AccountBook::new(),
            admin: None,
            sequence: 0,
            outbox: Vec::new(),
        }
    }

    pub fn with_config(config: &FeeConfig) -> Self {
        Self::new(FeeStructure::flat(config.fee_bips), config.policy)
    }

    // ========== LIQUIDITY ==========

    /// Seed the pool; the caller becomes its admin and receives
    /// `eth_amount` genesis shares.
    pub fn create_pool(&mut self, caller: &Address, token_amount: Amount, eth_amount: Amount) -> Result<Amount> {
        let planned = self.plan_create_pool(caller, token_amount, eth_amount);
        self.apply("create_pool", planned)
    }

    pub fn add_liquidity(
        &mut self,
        caller: &Address,
        eth_amount: Amount,
        max_rate: RateBound,
        min_rate: RateBound,
    ) -> Result<LiquidityReceipt> {
        let planned = self.plan_add_liquidity(caller, eth_amount, max_rate, min_rate);
        self.apply("add_liquidity", planned)
    }

    /// Withdraw exactly `eth_amount` ETH plus the matching token amount.
    pub fn remove_liquidity(
        &mut self,
        caller: &Address,
        eth_amount: Amount,
        max_rate: RateBound,
        min_rate: RateBound,
    ) -> Result<LiquidityReceipt> {
        let planned = self.plan_remove_liquidity(caller, eth_amount, max_rate, min_rate);
        self.apply("remove_liquidity", planned)
    }

    pub fn remove_all_liquidity(&mut self, caller: &Address) -> Result<LiquidityReceipt> {
        let planned = self.plan_remove_all_liquidity(caller);
        self.apply("remove_all_liquidity", planned)
    }

    // ========== SWAPS ==========

    pub fn swap_eth_for_tokens(&mut self, caller: &Address, eth_amount: Amount, max_rate: RateBound) -> Result<SwapReceipt> {
        let planned = self.plan_swap(caller, Asset::Eth, eth_amount, max_rate);
        self.apply("swap_eth_for_tokens", planned)
    }

    pub fn swap_tokens_for_eth(
        &mut self,
        caller: &Address,
        token_amount: Amount,
        max_rate: RateBound,
    ) -> Result<SwapReceipt> {
        let planned = self.plan_swap(caller, Asset::Token, token_amount, max_rate);
        self.apply("swap_tokens_for_eth", planned)
    }

    // ========== FEES ==========

    pub fn reinvest_fee_to_pool(&mut self, caller: &Address) -> Result<Reinvestment> {
        let planned = self.plan_reinvest(caller);
        self.apply("reinvest_fee_to_pool", planned)
    }

    pub fn distribute_eth_fee(&mut self, caller: &Address, fee: Amount) -> Result<()> {
        let planned = self.plan_distribute(caller, Asset::Eth, fee);
        self.apply("distribute_eth_fee", planned)
    }

    pub fn distribute_token_fee(&mut self, caller: &Address, fee: Amount) -> Result<()> {
        let planned = self.plan_distribute(caller, Asset::Token, fee);
        self.apply("distribute_token_fee", planned)
    }

    // ========== ACCOUNTS ==========

    /// Fund an account from outside the exchange.
    pub fn deposit(&mut self, account: &Address, asset: Asset, amount: Amount) -> Result<Amount> {
        self.accounts.deposit(account, asset, amount)
    }

    pub fn balance_of(&self, account: &Address, asset: Asset) -> Amount {
        self.accounts.balance_of(account, asset)
    }

    // ========== QUERIES ==========

    pub fn token_reserves(&self) -> Amount {
        self.pool.token_reserve()
    }

    pub fn eth_reserves(&self) -> Amount {
        self.pool.eth_reserve()
    }

    pub fn k(&self) -> Amount {
        self.pool.k()
    }

    /// Tokens per ETH; zero while the pool holds no reserves
    pub fn price_eth(&self) -> Rate {
        self.pool.price_eth().unwrap_or(Rate::ZERO)
    }

    /// ETH per token; zero while the pool holds no reserves
    pub fn price_token(&self) -> Rate {
        self.pool.price_token().unwrap_or(Rate::ZERO)
    }

    /// Maximum-rate bound for swapping `asset_in` with `slippage_pct` tolerance.
    ///
    /// Built from the pre-trade input-per-output rate rounded up, so a trade
    /// at the current price always fits.
    pub fn swap_bound(&self, asset_in: Asset, slippage_pct: u32) -> Result<RateBound> {
        let quote = self.pool.rate(asset_in.other(), Rounding::Up)?;
        RateBound::max_with_slippage(quote, slippage_pct)
    }

    /// `(max_rate, min_rate)` around the current tokens-per-ETH rate, for
    /// liquidity operations.
    pub fn liquidity_window(&self, slippage_pct: u32) -> Result<(RateBound, RateBound)> {
        let max_rate = RateBound::max_with_slippage(self.pool.rate(Asset::Eth, Rounding::Up)?, slippage_pct)?;
        let min_rate = RateBound::min_with_slippage(self.pool.rate(Asset::Eth, Rounding::Down)?, slippage_pct)?;
        Ok((max_rate, min_rate))
    }

    pub fn liquidity_amount(&self) -> Amount {
        self.ledger.total_shares()
    }

    pub fn liquidity_by_provider(&self, provider: &Address) -> Amount {
        self.ledger.shares_of(provider)
    }

    pub fn pending_eth_reward(&self) -> Amount {
        self.fees.pending_eth()
    }

    pub fn pending_token_reward(&self) -> Amount {
        self.fees.pending_token()
    }

    pub fn admin(&self) -> Option<&Address> {
        self.admin.as_ref()
    }

    pub fn bips(&self) -> u32 {
        self.engine.fee_bips()
    }

    pub fn providers(&self) -> &[Address] {
        self.ledger.providers()
    }

    pub fn provider_at(&self, index: usize) -> Option<&Address> {
        self.ledger.provider_at(index)
    }

    pub fn phase(&self) -> PoolPhase {
        self.pool.phase()
    }

    pub fn ledger(&self) -> &LiquidityLedger {
        &self.ledger
    }

    pub fn quote_eth_for_tokens(&self, eth_in: Amount) -> Result<SwapQuote> {
        self.engine.quote(&self.pool, Asset::Eth, eth_in)
    }

    pub fn quote_tokens_for_eth(&self, token_in: Amount) -> Result<SwapQuote> {
        self.engine.quote(&self.pool, Asset::Token, token_in)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            phase: self.pool.phase(),
            admin: self.admin.clone(),
            eth_reserve: self.pool.eth_reserve(),
            token_reserve: self.pool.token_reserve(),
            k: self.pool.k(),
            price_eth: spot_price(self.pool.token_reserve(), self.pool.eth_reserve()),
            price_token: spot_price(self.pool.eth_reserve(), self.pool.token_reserve()),
            total_shares: self.ledger.total_shares(),
            provider_count: self.ledger.providers().len(),
            fee_percent: bips_to_percent(self.engine.fee_bips()),
            pending_eth_reward: self.fees.pending_eth(),
            pending_token_reward: self.fees.pending_token(),
            sequence: self.sequence,
            timestamp: now(),
        }
    }

    /// Events of committed operations, oldest first
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.outbox)
    }

    // ========== PLANNING ==========

    fn plan(&self) -> Plan {
        Plan {
            pool: self.pool,
            fees: self.fees,
            mint: None,
            burn: None,
            account: None,
            admin: None,
            events: Vec::new(),
        }
    }

    fn plan_create_pool(&self, caller: &Address, token_amount: Amount, eth_amount: Amount) -> Result<(Plan, Amount)> {
        let pool = self.pool.create_pool(token_amount, eth_amount)?;
        let mint = self.ledger.plan_mint(caller, eth_amount, 0)?;
        let balance = self.accounts.plan(caller, &Transfer::pay(eth_amount, token_amount))?;
        let shares = mint.shares;

        let mut plan = self.plan();
        plan.pool = pool;
        plan.mint = Some(mint);
        plan.account = Some((caller.clone(), balance));
        plan.admin = Some(caller.clone());
        plan.events = vec![
            ExchangeEvent::PoolCreated {
                admin: caller.clone(),
                amount_eth: eth_amount,
                amount_token: token_amount,
                shares,
            },
            ExchangeEvent::AddLiquidity {
                from: caller.clone(),
                amount: eth_amount,
            },
        ];
        Ok((plan, shares))
    }

    fn plan_add_liquidity(
        &self,
        caller: &Address,
        eth_amount: Amount,
        max_rate: RateBound,
        min_rate: RateBound,
    ) -> Result<(Plan, LiquidityReceipt)> {
        self.pool.ensure_active()?;
        if eth_amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        self.check_rate_window(max_rate, min_rate)?;

        // Token side rounds up so the depositor never underpays the current ratio
        let token_amount = mul_div(
            eth_amount,
            self.pool.token_reserve(),
            self.pool.eth_reserve(),
            Rounding::Up,
        )?;
        let mint = self.ledger.plan_mint(caller, eth_amount, self.pool.eth_reserve())?;
        let pool = self.pool.apply_reserve_delta(eth_amount, token_amount, Direction::Deposit)?;
        let balance = self.accounts.plan(caller, &Transfer::pay(eth_amount, token_amount))?;

        let receipt = LiquidityReceipt {
            shares: mint.shares,
            amount_eth: eth_amount,
            amount_token: token_amount,
        };
        debug!(provider = %caller, ?receipt, "planned liquidity deposit");

        let mut plan = self.plan();
        plan.pool = pool;
        plan.mint = Some(mint);
        plan.account = Some((caller.clone(), balance));
        plan.events = vec![ExchangeEvent::AddLiquidity {
            from: caller.clone(),
            amount: eth_amount,
        }];
        Ok((plan, receipt))
    }

    fn plan_remove_liquidity(
        &self,
        caller: &Address,
        eth_amount: Amount,
        max_rate: RateBound,
        min_rate: RateBound,
    ) -> Result<(Plan, LiquidityReceipt)> {
        self.pool.ensure_active()?;
        let burn = self.ledger.plan_withdraw_eth(caller, eth_amount, &self.pool)?;
        self.check_rate_window(max_rate, min_rate)?;
        self.plan_withdrawal(caller, burn)
    }

    fn plan_remove_all_liquidity(&self, caller: &Address) -> Result<(Plan, LiquidityReceipt)> {
        let burn = self.ledger.plan_burn_all(caller, &self.pool)?;
        self.plan_withdrawal(caller, burn)
    }

    /// Shared tail of both removal paths. Burning the last shares folds any
    /// pending rewards into the reserves and pays the provider everything.
    fn plan_withdrawal(&self, caller: &Address, burn: ShareBurn) -> Result<(Plan, LiquidityReceipt)> {
        let mut plan = self.plan();

        let burn = if burn.shares == self.ledger.total_shares() {
            let (fees, pool, reinvestment) = self.fees.reinvest(&self.pool)?;
            if !reinvestment.is_empty() {
                plan.events.push(ExchangeEvent::FeesReinvested {
                    amount_eth: reinvestment.eth,
                    amount_token: reinvestment.token,
                });
            }
            let burn = self.ledger.plan_burn_all(caller, &pool)?;
            plan.fees = fees;
            plan.pool = pool
                .apply_reserve_delta(burn.eth_out, burn.token_out, Direction::Withdraw)?
                .into_drained();
            burn
        } else {
            plan.pool = self
                .pool
                .apply_reserve_delta(burn.eth_out, burn.token_out, Direction::Withdraw)?;
            burn
        };

        let balance = self.accounts.plan(caller, &Transfer::receive(burn.eth_out, burn.token_out))?;
        let receipt = LiquidityReceipt {
            shares: burn.shares,
            amount_eth: burn.eth_out,
            amount_token: burn.token_out,
        };
        let drained = plan.pool.phase() == PoolPhase::Drained;
        debug!(provider = %caller, ?receipt, drained, "planned withdrawal");

        plan.events.push(ExchangeEvent::RemoveLiquidity {
            to: caller.clone(),
            amount_eth: burn.eth_out,
            amount_token: burn.token_out,
        });
        plan.burn = Some(burn);
        plan.account = Some((caller.clone(), balance));
        Ok((plan, receipt))
    }

    fn plan_swap(
        &self,
        caller: &Address,
        asset_in: Asset,
        amount_in: Amount,
        max_rate: RateBound,
    ) -> Result<(Plan, SwapReceipt)> {
        let quote = self.engine.quote_with_bound(&self.pool, asset_in, amount_in, max_rate)?;
        let mut pool = self.engine.settle(&self.pool, &quote)?;
        let mut fees = self.fees.accumulate(asset_in, quote.fee)?;

        let mut reinvested = None;
        if fees.should_auto_reinvest() {
            let (next_fees, next_pool, reinvestment) = fees.reinvest(&pool)?;
            fees = next_fees;
            pool = next_pool;
            reinvested = Some(reinvestment);
        }

        let balance = self
            .accounts
            .plan(caller, &Transfer::exchange(asset_in, amount_in, quote.amount_out))?;

        let mut plan = self.plan();
        if asset_in == Asset::Eth {
            plan.events.push(ExchangeEvent::Received {
                from: caller.clone(),
                amount_eth: amount_in,
            });
        }
        plan.events.push(ExchangeEvent::Swap {
            trader: caller.clone(),
            asset_in,
            amount_in,
            amount_out: quote.amount_out,
            fee: quote.fee,
        });
        if let Some(reinvestment) = reinvested {
            plan.events.push(ExchangeEvent::FeesReinvested {
                amount_eth: reinvestment.eth,
                amount_token: reinvestment.token,
            });
        }
        plan.pool = pool;
        plan.fees = fees;
        plan.account = Some((caller.clone(), balance));

        Ok((plan, SwapReceipt { quote, reinvested }))
    }

    fn plan_reinvest(&self, caller: &Address) -> Result<(Plan, Reinvestment)> {
        self.ensure_admin(caller)?;
        let (fees, pool, reinvestment) = self.fees.reinvest(&self.pool)?;

        let mut plan = self.plan();
        plan.pool = pool;
        plan.fees = fees;
        if !reinvestment.is_empty() {
            plan.events.push(ExchangeEvent::FeesReinvested {
                amount_eth: reinvestment.eth,
                amount_token: reinvestment.token,
            });
        }
        Ok((plan, reinvestment))
    }

    fn plan_distribute(&self, caller: &Address, asset: Asset, fee: Amount) -> Result<(Plan, ())> {
        self.ensure_admin(caller)?;
        let (fees, pool) = self.fees.distribute(asset, fee, &self.pool)?;

        let mut plan = self.plan();
        plan.pool = pool;
        plan.fees = fees;
        plan.events.push(ExchangeEvent::FeeDistributed { asset, amount: fee });
        Ok((plan, ()))
    }

    /// The pool's current tokens-per-ETH rate must sit inside the caller's window.
    fn check_rate_window(&self, max_rate: RateBound, min_rate: RateBound) -> Result<Rate> {
        let rate = self.pool.price_eth()?;
        if !max_rate.admits_at_most(rate) {
            return Err(ExchangeError::SlippageExceeded {
                bound: max_rate,
                actual: rate,
            });
        }
        if !min_rate.admits_at_least(rate) {
            return Err(ExchangeError::SlippageExceeded {
                bound: min_rate,
                actual: rate,
            });
        }
        Ok(rate)
    }

    fn ensure_admin(&self, caller: &Address) -> Result<()> {
        match &self.admin {
            Some(admin) if admin == caller => Ok(()),
            Some(_) => Err(ExchangeError::Unauthorized(caller.clone())),
            None => Err(ExchangeError::NotInitialized),
        }
    }

    // ========== COMMIT ==========

    fn apply<T>(&mut self, op: &'static str, planned: Result<(Plan, T)>) -> Result<T> {
        match planned {
            Ok((plan, value)) => {
                self.commit(plan);
                info!(
                    op,
                    eth_reserve = self.pool.eth_reserve(),
                    token_reserve = self.pool.token_reserve(),
                    k = self.pool.k(),
                    "operation committed"
                );
                Ok(value)
            }
            Err(e) => {
                warn!(op, error = %e, requery = e.is_price_sensitive(), "operation rejected");
                Err(e)
            }
        }
    }

    fn commit(&mut self, plan: Plan) {
        self.pool = plan.pool;
        self.fees = plan.fees;
        if let Some(mint) = plan.mint {
            self.ledger.commit_mint(mint);
        }
        if let Some(burn) = &plan.burn {
            self.ledger.commit_burn(burn);
        }
        if let Some((account, balance)) = &plan.account {
            self.accounts.commit(account, *balance);
        }
        if plan.admin.is_some() {
            self.admin = plan.admin;
        }
        for event in plan.events {
            self.sequence += 1;
            self.outbox.push(EventRecord::new(self.sequence, event));
        }
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(FeeStructure::default(), FeePolicy::default())
    }
}

fn spot_price(numerator: Amount, denominator: Amount) -> Decimal {
    match (Decimal::from_u128(numerator), Decimal::from_u128(denominator)) {
        (Some(n), Some(d)) if !d.is_zero() => n.checked_div(d).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}
