pub use crate::errors::HarnessError;

pub mod cli;
pub mod compare;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod invocation;
pub mod kinds;
pub mod orchestrator;
pub mod process;
pub mod summary;
