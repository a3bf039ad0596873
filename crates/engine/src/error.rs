//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the node executor.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An item failed and continue-on-failure was off; the batch is aborted.
    #[error("item {item_index} failed: {message}")]
    ItemFailed {
        item_index: usize,
        /// Node error text, with upstream API detail appended when available.
        message: String,
        /// Raw upstream response body as JSON text.
        description: Option<String>,
    },

    /// The batch cannot be run at all.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),
}
