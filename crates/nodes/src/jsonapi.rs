//! JSON:API documents: building write payloads, reading relationship ids,
//! and turning `errors` arrays into readable messages.

use std::error::Error as StdError;

use serde_json::{json, Map, Value};

use crate::TransportError;

/// Media type used for both `Accept` and `Content-Type`.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Builder for `{data: {type, id?, attributes, relationships?}}`.
#[derive(Debug, Clone)]
pub struct ResourceObject {
    kind: &'static str,
    id: Option<String>,
    attributes: Map<String, Value>,
    relationships: Map<String, Value>,
}

impl ResourceObject {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            id: None,
            attributes: Map::new(),
            relationships: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_owned(), value.into());
        self
    }

    pub fn attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// To-one relationship `{name: {data: {type, id}}}`.
    pub fn relationship(mut self, name: &str, kind: &str, id: impl Into<String>) -> Self {
        self.relationships.insert(
            name.to_owned(),
            json!({ "data": { "type": kind, "id": id.into() } }),
        );
        self
    }

    pub fn into_document(self) -> Value {
        let mut data = Map::new();
        data.insert("type".into(), Value::String(self.kind.to_owned()));
        if let Some(id) = self.id {
            data.insert("id".into(), Value::String(id));
        }
        data.insert("attributes".into(), Value::Object(self.attributes));
        if !self.relationships.is_empty() {
            data.insert("relationships".into(), Value::Object(self.relationships));
        }
        json!({ "data": data })
    }
}

/// `data.id` of a document, when it is a non-empty string.
pub fn document_id(document: &Value) -> Option<String> {
    non_empty(document.pointer("/data/id"))
}

/// Id of a to-one relationship on a resource object. The first spelling that
/// resolves wins.
pub fn related_id(resource: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        resource
            .get("relationships")
            .and_then(|r| r.get(*name))
            .and_then(|rel| non_empty(rel.pointer("/data/id")))
    })
}

/// String attribute on a resource object. The first spelling that resolves wins.
pub fn attribute_string(resource: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        resource
            .get("attributes")
            .and_then(|a| a.get(*name))
            .and_then(|v| non_empty(Some(v)))
    })
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// One entry of a JSON:API `errors` array. Fields of the wrong type count
/// as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetail {
    pub detail: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
}

impl ErrorDetail {
    pub fn from_entry(entry: &Value) -> Self {
        let text = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let status = match entry.get("status") {
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => text("status"),
        };
        Self {
            detail: text("detail"),
            title: text("title"),
            status,
        }
    }

    fn summary(self) -> Option<String> {
        self.detail.or(self.title).or(self.status)
    }
}

/// Render every entry of `body.errors` and join them with `"; "`.
///
/// Returns `None` when the body has no non-empty `errors` array.
pub fn render_errors(body: &Value) -> Option<String> {
    let entries = body.get("errors")?.as_array()?;
    if entries.is_empty() {
        return None;
    }

    let rendered: Vec<String> = entries
        .iter()
        .map(|entry| {
            ErrorDetail::from_entry(entry)
                .summary()
                .unwrap_or_else(|| entry.to_string())
        })
        .collect();

    Some(rendered.join("; "))
}

/// Find the upstream response body on `error` or anywhere in its source chain.
pub fn upstream_body<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a Value> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(body) = err
            .downcast_ref::<TransportError>()
            .and_then(TransportError::response_body)
        {
            return Some(body);
        }
        current = err.source();
    }
    None
}

/// JSON:API error text for `error`, if its upstream response carried any.
pub fn extract_error_details(error: &(dyn StdError + 'static)) -> Option<String> {
    upstream_body(error).and_then(render_errors)
}
