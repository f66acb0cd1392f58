pub mod batch_execute;
pub mod confirm;
pub mod execute;
pub mod hash;
pub mod info;
pub mod propose;
pub(crate) mod utils;
