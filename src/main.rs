use amm_exchange::{
    event::{EventSink, LogSink, NullSink},
    exchange::{Exchange, ExchangeHandle},
    types::{Address, Asset},
    utils::{config::Config, logger},
};
use tracing::{error, info};

const ADMIN: &str = "0x00000000000000000000000000000000000000ad";
const TRADER: &str = "0x0000000000000000000000000000000000007ade";

/// Slippage tolerance used by the walkthrough, in percent
const SLIPPAGE_PCT: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    logger::init(&config.logging_config().level);
    info!(
        name = %config.pool_config().exchange_name,
        token = %config.pool_config().token_symbol,
        fee_bips = config.fee_config().fee_bips,
        policy = %config.fee_config().policy,
        "Starting exchange"
    );

    let exchange = Exchange::with_config(config.fee_config());
    if config.logging_config().log_events {
        run(ExchangeHandle::new(exchange, LogSink), &config).await
    } else {
        run(ExchangeHandle::new(exchange, NullSink), &config).await
    }
}

async fn run<S: EventSink>(handle: ExchangeHandle<S>, config: &Config) -> anyhow::Result<()> {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        },
        result = walkthrough(&handle, config) => {
            if let Err(e) = result {
                error!("Walkthrough failed: {}", e);
                return Err(e);
            }
        }
    }

    let snapshot = handle.snapshot().await;
    info!("{}", snapshot);
    info!("Exchange shutdown complete");
    Ok(())
}

/// Seed the pool and exercise every trading path once
async fn walkthrough<S: EventSink>(handle: &ExchangeHandle<S>, config: &Config) -> anyhow::Result<()> {
    let admin: Address = ADMIN.parse()?;
    let trader: Address = TRADER.parse()?;
    let supply = u128::from(config.pool_config().initial_supply);
    let funding = u128::from(config.pool_config().trader_funding);

    handle.deposit(&admin, Asset::Eth, supply * 2).await?;
    handle.deposit(&admin, Asset::Token, supply * 2).await?;
    handle.deposit(&trader, Asset::Eth, funding).await?;
    handle.deposit(&trader, Asset::Token, funding).await?;

    let shares = handle.create_pool(&admin, supply, supply).await?;
    info!(shares, "Pool created");

    let bound = handle.read(|ex| ex.swap_bound(Asset::Eth, SLIPPAGE_PCT)).await?;
    let receipt = handle.swap_eth_for_tokens(&trader, 10_000_000, bound).await?;
    info!(tokens_out = receipt.amount_out(), "Swapped ETH for tokens");

    let (max_rate, min_rate) = handle.read(|ex| ex.liquidity_window(SLIPPAGE_PCT)).await?;
    let added = handle.add_liquidity(&admin, 1_000_000, max_rate, min_rate).await?;
    info!(shares = added.shares, tokens = added.amount_token, "Added liquidity");

    let (max_rate, min_rate) = handle.read(|ex| ex.liquidity_window(SLIPPAGE_PCT)).await?;
    let removed = handle.remove_liquidity(&admin, 100_000, max_rate, min_rate).await?;
    info!(shares = removed.shares, tokens = removed.amount_token, "Removed liquidity");

    let bound = handle.read(|ex| ex.swap_bound(Asset::Token, SLIPPAGE_PCT)).await?;
    let receipt = handle.swap_tokens_for_eth(&trader, 100_000, bound).await?;
    info!(eth_out = receipt.amount_out(), "Swapped tokens for ETH");

    info!(
        trader_eth = handle.balance_of(&trader, Asset::Eth).await,
        trader_token = handle.balance_of(&trader, Asset::Token).await,
        "Trader balances"
    );
    Ok(())
}
