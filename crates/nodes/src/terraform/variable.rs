//! Workspace variables.

use serde_json::{Map, Value};

use super::normalize::action_record;
use super::operation::VariableOperation;
use super::request::{ItemScope, OperationRequest};
use crate::jsonapi::ResourceObject;
use crate::params::{scalar_to_string, OptionBag};
use crate::NodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Terraform,
    Env,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "terraform" => Some(Self::Terraform),
            "env" => Some(Self::Env),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::Env => "env",
        }
    }
}

/// Attributes of a `vars` resource.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableAttributes {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: Category,
    pub hcl: bool,
    pub sensitive: bool,
}

impl VariableAttributes {
    /// Read one entry of a workspace's `variables` collection. `position` is
    /// only used in error messages.
    pub fn from_entry(entry: &OptionBag, position: usize) -> Result<Self, NodeError> {
        let key = entry.string("key").ok_or_else(|| {
            NodeError::validation(format!("Variable at index {position} is missing a key"))
        })?;
        let value = entry.raw("value").and_then(scalar_to_string).ok_or_else(|| {
            NodeError::validation(format!(
                "Variable at index {position} ({key}) is missing a value"
            ))
        })?;
        let category_raw = entry.string("category").unwrap_or_default();
        let category = Category::parse(&category_raw).ok_or_else(|| {
            NodeError::validation(format!(
                "Variable at index {position} ({key}) has unknown category '{category_raw}'"
            ))
        })?;

        Ok(Self {
            key,
            value,
            description: entry.string("description"),
            category,
            hcl: entry.boolean("hcl").unwrap_or(false),
            sensitive: entry.boolean("sensitive").unwrap_or(false),
        })
    }

    fn from_scope(scope: &ItemScope<'_>) -> Result<Self, NodeError> {
        let key = scope.required("key")?;
        let value = scope.raw("value").and_then(scalar_to_string).ok_or_else(|| {
            NodeError::validation(format!(
                "Parameter 'value' is required (item {})",
                scope.index
            ))
        })?;
        let category_raw = scope.string("category", "terraform");
        let category = Category::parse(&category_raw).ok_or_else(|| {
            NodeError::validation(format!("Unknown variable category '{category_raw}'"))
        })?;
        let description = scope.string("description", "");

        Ok(Self {
            key,
            value,
            description: (!description.trim().is_empty()).then_some(description),
            category,
            hcl: scope.boolean("hcl", false),
            sensitive: scope.boolean("sensitive", false),
        })
    }

    pub fn to_attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("key".into(), Value::String(self.key.clone()));
        attributes.insert("value".into(), Value::String(self.value.clone()));
        if let Some(description) = &self.description {
            attributes.insert("description".into(), Value::String(description.clone()));
        }
        attributes.insert("category".into(), Value::String(self.category.as_str().into()));
        attributes.insert("hcl".into(), Value::Bool(self.hcl));
        attributes.insert("sensitive".into(), Value::Bool(self.sensitive));
        attributes
    }
}

pub fn create_request(workspace_id: &str, variable: &VariableAttributes) -> OperationRequest {
    let body = ResourceObject::new("vars")
        .attributes(variable.to_attributes())
        .into_document();
    OperationRequest::post(format!("/workspaces/{workspace_id}/vars"), body)
}

pub fn update_request(variable_id: &str, variable: &VariableAttributes) -> OperationRequest {
    let body = ResourceObject::new("vars")
        .with_id(variable_id)
        .attributes(variable.to_attributes())
        .into_document();
    OperationRequest::patch(format!("/vars/{variable_id}"), body)
}

pub(crate) async fn execute(
    op: VariableOperation,
    scope: &ItemScope<'_>,
) -> Result<Value, NodeError> {
    match op {
        VariableOperation::Create => {
            let workspace_id = scope.required("workspaceId")?;
            let variable = VariableAttributes::from_scope(scope)?;
            scope.send(create_request(&workspace_id, &variable)).await
        }
        VariableOperation::Update => {
            let variable_id = scope.required("variableId")?;
            let variable = VariableAttributes::from_scope(scope)?;
            scope.send(update_request(&variable_id, &variable)).await
        }
        VariableOperation::Delete => {
            let variable_id = scope.required("variableId")?;
            let request = OperationRequest::delete(format!("/vars/{variable_id}")).full_response();
            let response = scope.send(request).await?;
            Ok(action_record("variableId", &variable_id, "delete", &response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> OptionBag {
        OptionBag(value.as_object().unwrap().clone())
    }

    #[test]
    fn entry_defaults_to_a_plain_terraform_variable() {
        let variable = VariableAttributes::from_entry(&bag(json!({ "key": "region", "value": "eu-west-1" })), 0).unwrap();
        assert_eq!(variable.category, Category::Terraform);
        assert!(!variable.hcl && !variable.sensitive);
        assert_eq!(
            Value::Object(variable.to_attributes()),
            json!({
                "key": "region",
                "value": "eu-west-1",
                "category": "terraform",
                "hcl": false,
                "sensitive": false
            })
        );
    }

    #[test]
    fn entry_without_value_names_its_index() {
        let err = VariableAttributes::from_entry(&bag(json!({ "key": "token" })), 3).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("index 3"));
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn entry_with_unknown_category_is_rejected() {
        let err = VariableAttributes::from_entry(
            &bag(json!({ "key": "k", "value": "v", "category": "secret" })),
            0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn update_carries_the_variable_id() {
        let variable = VariableAttributes {
            key: "AWS_REGION".into(),
            value: "us-east-1".into(),
            description: Some("region".into()),
            category: Category::Env,
            hcl: false,
            sensitive: true,
        };
        let request = update_request("var-1", &variable);
        assert_eq!(request.path, "/vars/var-1");
        let data = &request.body.unwrap()["data"];
        assert_eq!(data["id"], "var-1");
        assert_eq!(data["type"], "vars");
        assert_eq!(data["attributes"]["category"], "env");
        assert_eq!(data["attributes"]["description"], "region");
        assert_eq!(data["attributes"]["sensitive"], true);
    }
}
