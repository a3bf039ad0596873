//! `engine` crate: batch models and the node execution loop.

pub mod error;
pub mod executor;
pub mod models;

pub use error::EngineError;
pub use executor::{ExecutorConfig, NodeExecutor};
pub use models::{BatchDefinition, BatchReport, ItemDefinition, OutputRecord};
