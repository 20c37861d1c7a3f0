//! Per-character allocation state

mod data;
mod error;
mod ledger;
mod respec;

pub use data::TreeData;
pub use error::{AllocationError, AllocationResult, ErrorCategory};
pub use ledger::TreeState;
pub use respec::RespecConfig;
