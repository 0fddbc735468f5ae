//! End-to-end flows against a single exchange: pool seeding, trading,
//! liquidity round trips and the no-mutation-on-error guarantee.

use amm_exchange::event::ChannelSink;
use amm_exchange::exchange::{Exchange, ExchangeHandle};
use amm_exchange::pool::{FeePolicy, FeeStructure, PoolPhase};
use amm_exchange::types::{Address, Amount, Asset, ExchangeError, Rate, RateBound};

const SUPPLY: Amount = 10_000_000_000;
const SLIPPAGE_PCT: u32 = 10;

fn admin() -> Address {
    Address::new("0x00000000000000000000000000000000000000ad")
}

fn trader() -> Address {
    Address::new("0x0000000000000000000000000000000000007ade")
}

/// Pool, shares, pending rewards and both accounts, for before/after comparison
#[derive(Debug, PartialEq, Eq)]
struct State {
    eth_reserve: Amount,
    token_reserve: Amount,
    total_shares: Amount,
    pending: (Amount, Amount),
    admin: (Amount, Amount),
    trader: (Amount, Amount),
}

impl State {
    fn take(exchange: &Exchange) -> Self {
        let balances = |who: &Address| (exchange.balance_of(who, Asset::Eth), exchange.balance_of(who, Asset::Token));
        State {
            eth_reserve: exchange.eth_reserves(),
            token_reserve: exchange.token_reserves(),
            total_shares: exchange.liquidity_amount(),
            pending: (exchange.pending_eth_reward(), exchange.pending_token_reward()),
            admin: balances(&admin()),
            trader: balances(&trader()),
        }
    }
}

fn exchange(fee_bips: u32, policy: FeePolicy) -> Exchange {
    exchange_with(SUPPLY, SUPPLY, fee_bips, policy)
}

fn exchange_with(token: Amount, eth: Amount, fee_bips: u32, policy: FeePolicy) -> Exchange {
    let mut exchange = Exchange::new(FeeStructure::flat(fee_bips), policy);
    let funding = 2 * token.max(eth);
    for account in [admin(), trader()] {
        exchange.deposit(&account, Asset::Eth, funding).unwrap();
        exchange.deposit(&account, Asset::Token, funding).unwrap();
    }
    exchange.create_pool(&admin(), token, eth).unwrap();
    exchange.drain_events();
    exchange
}

#[test]
fn test_swap_then_add_liquidity_scenario() {
    let mut exchange = exchange(0, FeePolicy::Manual);

    let bound = exchange.swap_bound(Asset::Eth, SLIPPAGE_PCT).unwrap();
    assert_eq!(bound.scaled(), 110);
    let receipt = exchange.swap_eth_for_tokens(&trader(), 10_000_000, bound).unwrap();

    assert_eq!(receipt.amount_out(), 9_990_009);
    assert_eq!(exchange.eth_reserves(), 10_010_000_000);
    assert!(exchange.token_reserves() > 9_990_000_000);
    assert!(exchange.token_reserves() < 10_000_000_000);

    let before = State::take(&exchange);
    let (max_rate, min_rate) = exchange.liquidity_window(SLIPPAGE_PCT).unwrap();
    let added = exchange.add_liquidity(&trader(), 1_000_000, max_rate, min_rate).unwrap();

    assert!(exchange.eth_reserves() > before.eth_reserve);
    assert!(exchange.token_reserves() > before.token_reserve);
    assert!(exchange.balance_of(&trader(), Asset::Token) < before.trader.1);
    assert_eq!(added.amount_token, 998_003);
    assert_eq!(exchange.liquidity_by_provider(&trader()), added.shares);
}

#[test]
fn test_second_create_pool_rejected() {
    let mut exchange = exchange(30, FeePolicy::ReinvestOnPair);
    let before = State::take(&exchange);

    let result = exchange.create_pool(&trader(), 1_000, 1_000);
    assert!(matches!(result, Err(ExchangeError::AlreadyInitialized)));
    assert_eq!(State::take(&exchange), before);
    assert_eq!(exchange.admin(), Some(&admin()));
    assert!(exchange.drain_events().is_empty());
}

#[test]
fn test_slippage_rejected_swap_leaves_state() {
    let mut exchange = exchange(0, FeePolicy::Manual);
    let before = State::take(&exchange);

    // 1:1 pool; 10_000_000 in buys 9_990_009 out, a realized rate of 1.01
    let result = exchange.swap_eth_for_tokens(&trader(), 10_000_000, RateBound::from_scaled(100));
    match result {
        Err(ExchangeError::SlippageExceeded { bound, actual }) => {
            assert_eq!(bound.scaled(), 100);
            assert_eq!(actual.scaled(), 101);
        }
        other => panic!("expected slippage rejection, got {:?}", other),
    }
    assert_eq!(State::take(&exchange), before);
    assert!(exchange.drain_events().is_empty());

    let result = exchange.swap_tokens_for_eth(&trader(), 10_000_000, RateBound::from_scaled(100));
    assert!(matches!(result, Err(ExchangeError::SlippageExceeded { .. })));
    assert_eq!(State::take(&exchange), before);
}

#[test]
fn test_cheap_token_swap_stays_bounded() {
    // 1 ETH = 200 tokens: ETH per token floors to zero at two decimals
    let mut exchange = exchange_with(200_000_000_000, 1_000_000_000, 0, FeePolicy::Manual);
    assert_eq!(exchange.price_token(), Rate::ZERO);
    assert!(matches!(
        RateBound::max_with_slippage(exchange.price_token(), SLIPPAGE_PCT),
        Err(ExchangeError::UnboundableRate(_))
    ));

    let bound = exchange.swap_bound(Asset::Eth, SLIPPAGE_PCT).unwrap();
    assert!(!bound.is_disabled());
    assert_eq!(bound.scaled(), 2);

    // 4e9 wei buys 160e9 tokens, a realized rate of 0.025 ETH per token
    let before = State::take(&exchange);
    let result = exchange.swap_eth_for_tokens(&trader(), 4_000_000_000, bound);
    assert!(matches!(
        result,
        Err(ExchangeError::SlippageExceeded { actual, .. }) if actual.scaled() == 3
    ));
    assert_eq!(State::take(&exchange), before);

    assert!(exchange.swap_eth_for_tokens(&trader(), 1_000_000, bound).is_ok());
}

#[test]
fn test_remove_all_then_readd_returns_original_shares() {
    let mut exchange = exchange(0, FeePolicy::Manual);
    exchange.swap_eth_for_tokens(&trader(), 123_456_789, RateBound::NONE).unwrap();

    let added = exchange
        .add_liquidity(&trader(), 7_654_321, RateBound::NONE, RateBound::NONE)
        .unwrap();
    let removed = exchange.remove_all_liquidity(&trader()).unwrap();
    assert_eq!(removed.shares, added.shares);
    assert_eq!(exchange.liquidity_by_provider(&trader()), 0);
    assert_eq!(exchange.providers(), &[admin()]);

    let readded = exchange
        .add_liquidity(&trader(), removed.amount_eth, RateBound::NONE, RateBound::NONE)
        .unwrap();
    assert!(added.shares.abs_diff(readded.shares) <= 2);
    assert_eq!(exchange.phase(), PoolPhase::Active);
}

#[test]
fn test_sole_provider_exit_drains_pool() {
    let mut exchange = exchange(30, FeePolicy::ReinvestOnPair);
    exchange.swap_eth_for_tokens(&trader(), 50_000_000, RateBound::NONE).unwrap();
    let pending = exchange.pending_eth_reward();
    assert!(pending > 0);

    let eth_owed = exchange.eth_reserves() + pending;
    let token_owed = exchange.token_reserves();
    let admin_eth = exchange.balance_of(&admin(), Asset::Eth);

    let receipt = exchange.remove_all_liquidity(&admin()).unwrap();
    assert_eq!(receipt.amount_eth, eth_owed);
    assert_eq!(receipt.amount_token, token_owed);
    assert_eq!(exchange.balance_of(&admin(), Asset::Eth), admin_eth + eth_owed);
    assert_eq!(exchange.phase(), PoolPhase::Drained);
    assert_eq!(exchange.k(), 0);

    let names: Vec<&str> = exchange.drain_events().iter().map(|r| r.event.name()).collect();
    assert_eq!(names, vec!["Received", "Swap", "FeesReinvested", "RemoveLiquidity"]);
}

#[test]
fn test_swap_round_trip_never_profits() {
    let mut exchange = exchange(30, FeePolicy::ReinvestOnPair);
    let eth_before = exchange.balance_of(&trader(), Asset::Eth);

    let tokens = exchange
        .swap_eth_for_tokens(&trader(), 1_000_000, RateBound::NONE)
        .unwrap()
        .amount_out();
    let eth_back = exchange
        .swap_tokens_for_eth(&trader(), tokens, RateBound::NONE)
        .unwrap()
        .amount_out();

    assert!(eth_back < 1_000_000);
    assert_eq!(exchange.balance_of(&trader(), Asset::Eth), eth_before - 1_000_000 + eth_back);
}

#[tokio::test]
async fn test_handle_streams_events_in_order() {
    let (sink, mut receiver) = ChannelSink::new(64);
    let handle = ExchangeHandle::new(Exchange::new(FeeStructure::flat(30), FeePolicy::Manual), sink);
    handle.deposit(&admin(), Asset::Eth, 2 * SUPPLY).await.unwrap();
    handle.deposit(&admin(), Asset::Token, 2 * SUPPLY).await.unwrap();

    handle.create_pool(&admin(), SUPPLY, SUPPLY).await.unwrap();
    handle.swap_eth_for_tokens(&admin(), 1_000_000, RateBound::NONE).await.unwrap();
    handle.distribute_eth_fee(&admin(), 1_000).await.unwrap();
    assert!(matches!(
        handle.distribute_eth_fee(&trader(), 1).await,
        Err(ExchangeError::Unauthorized(_))
    ));

    let mut sequences = Vec::new();
    let mut names = Vec::new();
    while let Ok(record) = receiver.try_recv() {
        sequences.push(record.sequence);
        names.push(record.event.name());
    }
    assert_eq!(names, vec!["PoolCreated", "AddLiquidity", "Received", "Swap", "FeeDistributed"]);
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    assert_eq!(handle.snapshot().await.pending_eth_reward, 2_000);
}
