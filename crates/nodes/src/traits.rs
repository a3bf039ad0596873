//! The `ExecutableNode` trait: the contract every node must fulfil.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{NodeError, NodeParameters};

/// One unit of input data flowing through a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Position of the item in the input batch.
    pub index: usize,
    /// The item's JSON payload.
    #[serde(default)]
    pub json: Value,
}

impl Item {
    pub fn new(index: usize, json: Value) -> Self {
        Self { index, json }
    }
}

/// Shared context passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the current batch run.
    pub execution_id: uuid::Uuid,
    /// Resolved node parameters, looked up per item index.
    pub parameters: NodeParameters,
}

impl ExecutionContext {
    pub fn new(parameters: NodeParameters) -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4(),
            parameters,
        }
    }
}

/// The core node trait.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node for a single input item and return the JSON output
    /// record for that item.
    async fn execute(&self, item: &Item, ctx: &ExecutionContext) -> Result<Value, NodeError>;

    /// Offline check of an item's parameters. Must not perform any I/O.
    fn validate_item(&self, _item: &Item, _ctx: &ExecutionContext) -> Result<(), NodeError> {
        Ok(())
    }

    /// Human-readable detail pulled out of an error's upstream payload.
    ///
    /// The engine appends this to the message of a fatal failure. Nodes that
    /// talk to APIs with structured error bodies override it.
    fn error_details(&self, _error: &NodeError) -> Option<String> {
        None
    }
}
