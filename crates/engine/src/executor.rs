//! Batch execution engine.
//!
//! `NodeExecutor` runs one node over every item of a batch:
//! 1. Splits the batch into indexed items and per-item parameters.
//! 2. Dispatches each item through `ExecutableNode`, strictly in order.
//! 3. Pairs every output record with the index of the item that produced it.
//! 4. Either contains a failure as an `{error}` record (continue-on-failure)
//!    or aborts with `EngineError::ItemFailed`. Nothing is retried.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use nodes::{ExecutableNode, ExecutionContext, NodeError};

use crate::{BatchDefinition, BatchReport, EngineError, OutputRecord};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Turn item failures into `{error}` records instead of aborting. Also
    /// enabled by a batch's own `continueOnFail`.
    pub continue_on_fail: bool,
}

// ---------------------------------------------------------------------------
// NodeExecutor
// ---------------------------------------------------------------------------

/// Runs a single node over batches of items.
pub struct NodeExecutor {
    node: Arc<dyn ExecutableNode>,
    config: ExecutorConfig,
}

impl NodeExecutor {
    pub fn new(node: Arc<dyn ExecutableNode>, config: ExecutorConfig) -> Self {
        Self { node, config }
    }

    /// Run every item of `batch` and return one record per item.
    ///
    /// # Errors
    /// Returns `EngineError::ItemFailed` for the first failing item when
    /// continue-on-failure is off. Later items are not executed.
    #[instrument(skip(self, batch), fields(items = batch.items.len()))]
    pub async fn run(&self, batch: BatchDefinition) -> Result<BatchReport, EngineError> {
        let continue_on_fail = self.config.continue_on_fail || batch.continue_on_fail;
        let (items, parameters) = batch.into_parts();
        let ctx = ExecutionContext::new(parameters);
        let started_at = Utc::now();

        info!(
            "execution {} started: {} items, continue_on_fail={}",
            ctx.execution_id,
            items.len(),
            continue_on_fail
        );

        let mut records = Vec::with_capacity(items.len());

        for item in &items {
            match self.node.execute(item, &ctx).await {
                Ok(json) => {
                    info!("item {} succeeded", item.index);
                    records.push(OutputRecord::new(json, item.index));
                }

                Err(err) if continue_on_fail => {
                    warn!("item {} failed, continuing: {}", item.index, err);
                    records.push(OutputRecord::error(err.to_string(), item.index));
                }

                Err(err) => {
                    let failure = self.item_failed(item.index, &err);
                    error!(
                        status = ?err.status(),
                        "item {} failed, aborting execution: {}",
                        item.index,
                        failure
                    );
                    return Err(failure);
                }
            }
        }

        info!(
            "execution {} finished with {} records",
            ctx.execution_id,
            records.len()
        );

        Ok(BatchReport {
            execution_id: ctx.execution_id,
            started_at,
            finished_at: Utc::now(),
            records,
        })
    }

    /// Check every item offline without sending anything.
    ///
    /// # Errors
    /// `EngineError::InvalidBatch` naming the first rejected item.
    pub fn validate(&self, batch: BatchDefinition) -> Result<usize, EngineError> {
        let (items, parameters) = batch.into_parts();
        if items.is_empty() {
            return Err(EngineError::InvalidBatch("batch has no items".into()));
        }

        let ctx = ExecutionContext::new(parameters);
        for item in &items {
            self.node.validate_item(item, &ctx).map_err(|err| {
                EngineError::InvalidBatch(format!("item {}: {}", item.index, err))
            })?;
        }
        Ok(items.len())
    }

    // -----------------------------------------------------------------------
    // Internal: enrich a fatal failure with upstream detail.
    // -----------------------------------------------------------------------

    fn item_failed(&self, item_index: usize, err: &NodeError) -> EngineError {
        let message = match self.node.error_details(err) {
            Some(details) => format!("{err}: {details}"),
            None => err.to_string(),
        };
        EngineError::ItemFailed {
            item_index,
            message,
            description: err.response_body().map(|body| body.to_string()),
        }
    }
}
