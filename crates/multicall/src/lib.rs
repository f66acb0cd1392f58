//! Packed multi-send encoding for batching several calls into one atomic transaction.

mod addresses;
mod contract;
mod error;
mod multi_send;

pub use addresses::*;
pub use contract::IMultiSendCallOnly;
pub use error::*;
pub use multi_send::*;
