//! Node-level error type.

use serde_json::Value;
use thiserror::Error;

use crate::TransportError;

/// Errors returned by a node's `execute` method.
///
/// The engine never retries. With continue-on-failure every variant becomes
/// an `{error}` record for the item; otherwise the first error aborts the batch.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A parameter is missing, empty or contradictory. Raised before any
    /// request for the item is sent.
    #[error("{0}")]
    Validation(String),

    /// The API answered with a non-2xx status or the request never completed.
    #[error("request failed: {0}")]
    Upstream(#[from] TransportError),

    /// The selected resource is not known to the node.
    #[error("Unsupported resource: {0}")]
    UnsupportedResource(String),

    /// The selected operation is not known for the resource.
    #[error("Unsupported {resource} operation: {operation}")]
    UnsupportedOperation { resource: String, operation: String },
}

impl NodeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedResource(_) | Self::UnsupportedOperation { .. }
        )
    }

    /// HTTP status of an upstream failure, when the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream(transport) => transport.status(),
            _ => None,
        }
    }

    /// The decoded response body attached to an upstream failure, if any.
    pub fn response_body(&self) -> Option<&Value> {
        match self {
            Self::Upstream(transport) => transport.response_body(),
            _ => None,
        }
    }
}
