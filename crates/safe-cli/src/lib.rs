pub mod cmd;
pub mod common;
pub mod logging;
pub mod runner;

mod utils;
