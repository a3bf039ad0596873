//! Per-item parameter lookup.
//!
//! The host resolves every node parameter for every item (expressions may make
//! them differ between items). Item-level values shadow node-level values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::NodeError;

/// Node parameters with optional per-item overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeParameters {
    #[serde(default)]
    node: Map<String, Value>,
    #[serde(default)]
    items: Vec<Map<String, Value>>,
}

impl NodeParameters {
    pub fn new(node: Map<String, Value>) -> Self {
        Self { node, items: Vec::new() }
    }

    /// Attach per-item overrides, indexed like the input items.
    pub fn with_item_overrides(mut self, items: Vec<Map<String, Value>>) -> Self {
        self.items = items;
        self
    }

    /// Raw lookup. `null` counts as absent.
    pub fn get(&self, name: &str, item_index: usize) -> Option<&Value> {
        self.items
            .get(item_index)
            .and_then(|overrides| overrides.get(name))
            .filter(|v| !v.is_null())
            .or_else(|| self.node.get(name).filter(|v| !v.is_null()))
    }

    /// String parameter, falling back to `default` when absent.
    pub fn string(&self, name: &str, item_index: usize, default: &str) -> String {
        self.get(name, item_index)
            .and_then(scalar_to_string)
            .unwrap_or_else(|| default.to_owned())
    }

    /// String parameter that must be present and non-blank.
    pub fn required_string(&self, name: &str, item_index: usize) -> Result<String, NodeError> {
        let value = self.string(name, item_index, "");
        if value.trim().is_empty() {
            return Err(NodeError::validation(format!(
                "Parameter '{name}' is required (item {item_index})"
            )));
        }
        Ok(value)
    }

    pub fn boolean(&self, name: &str, item_index: usize, default: bool) -> bool {
        self.get(name, item_index)
            .and_then(value_to_bool)
            .unwrap_or(default)
    }

    /// Collection parameter; absent or non-object values yield an empty bag.
    pub fn options(&self, name: &str, item_index: usize) -> OptionBag {
        let map = self
            .get(name, item_index)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        OptionBag(map)
    }
}

/// A sparse collection of optional settings. Only keys the user actually set
/// are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionBag(pub Map<String, Value>);

impl OptionBag {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Non-blank string option.
    pub fn string(&self, key: &str) -> Option<String> {
        self.raw(key)
            .and_then(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
    }

    /// Boolean option; present means set, whatever its value.
    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.raw(key).and_then(value_to_bool)
    }

    /// Positive numeric option rendered for a query string. Zero is unset.
    pub fn positive_number(&self, key: &str) -> Option<String> {
        match self.raw(key)? {
            Value::Number(n) => n
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| n.to_string()),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(|n| n.to_string()),
            _ => None,
        }
    }

    /// Nested collection; absent yields an empty bag.
    pub fn bag(&self, key: &str) -> OptionBag {
        OptionBag(
            self.raw(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
