//! Batch models for the node executor.
//!
//! A batch is what the host hands a node in one execution: node-level
//! parameters, the input items and the continue-on-failure flag. These types
//! are also the on-disk format read by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use nodes::{Item, NodeParameters};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One input item with optional per-item parameter overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default)]
    pub json: Value,
    /// Values here shadow the batch-level parameters for this item only.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// A complete batch definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDefinition {
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl BatchDefinition {
    /// Batch where every item shares the same parameters.
    pub fn new(parameters: Map<String, Value>, items: Vec<Value>) -> Self {
        Self {
            parameters,
            items: items
                .into_iter()
                .map(|json| ItemDefinition {
                    json,
                    parameters: Map::new(),
                })
                .collect(),
            continue_on_fail: false,
        }
    }

    /// Split into indexed items and the parameter source the node reads from.
    pub fn into_parts(self) -> (Vec<Item>, NodeParameters) {
        let (items, overrides): (Vec<Item>, Vec<Map<String, Value>>) = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, def)| (Item::new(index, def.json), def.parameters))
            .unzip();

        let parameters = NodeParameters::new(self.parameters).with_item_overrides(overrides);
        (items, parameters)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One output record, linked back to the input item that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub json: Value,
    pub paired_item: usize,
}

impl OutputRecord {
    pub fn new(json: Value, paired_item: usize) -> Self {
        Self { json, paired_item }
    }

    /// Record for an item whose failure was contained.
    pub fn error(message: impl Into<String>, paired_item: usize) -> Self {
        Self::new(serde_json::json!({ "error": message.into() }), paired_item)
    }

    pub fn is_error(&self) -> bool {
        self.json.get("error").is_some()
    }
}

/// The result of running a whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub execution_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One record per input item, in input order.
    pub records: Vec<OutputRecord>,
}
