pub mod common;
pub mod error;
pub mod event;
pub mod rate;
pub mod snapshot;

pub use common::*;
pub use error::*;
pub use event::*;
pub use rate::*;
pub use snapshot::*;
