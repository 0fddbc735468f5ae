pub mod accounts;
pub mod handle;
pub mod service;

pub use accounts::{AccountBook, Balance, Transfer};
pub use handle::ExchangeHandle;
pub use service::{Exchange, LiquidityReceipt, SwapReceipt};
