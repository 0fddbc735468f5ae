pub mod fees;
pub mod ledger;
pub mod state;

pub use fees::*;
pub use ledger::*;
pub use state::*;
