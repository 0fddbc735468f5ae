#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(unused_must_use)]
pub mod event;
pub mod exchange;
pub mod pool;
pub mod swap;
pub mod types;
pub mod utils;
