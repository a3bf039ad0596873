//! Terraform Cloud node.
//!
//! Maps a `(resource, operation)` selector and flat parameters onto JSON:API
//! requests against the Terraform Cloud v2 API. Each item is handled on its
//! own; multi-call operations (`workspace:create` with variables,
//! `workspace:getState`) finish all their calls before the item returns.

pub mod config;
pub mod normalize;
pub mod operation;
mod organization;
pub mod request;
pub mod run;
pub mod variable;
pub mod workspace;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::jsonapi;
use crate::transport::HttpTransport;
use crate::{ExecutableNode, ExecutionContext, Item, NodeError};

pub use config::{ConfigError, TerraformCloudConfig, DEFAULT_BASE_URL};
pub use normalize::{normalize, OperationResult};
pub use operation::{Operation, Resource};
pub use request::OperationRequest;

use request::ItemScope;

/// Node type name used in batch definitions.
pub const NODE_TYPE: &str = "terraformCloud";

pub struct TerraformCloudNode {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl TerraformCloudNode {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Node backed by an authenticated `reqwest` transport.
    pub fn from_config(config: &TerraformCloudConfig) -> Result<Self, crate::TransportError> {
        let transport = config.transport()?;
        Ok(Self::new(Arc::new(transport)).with_base_url(config.base_url.as_str()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the token with `GET /account/details`; returns the account body.
    pub async fn verify_credentials(&self) -> Result<Value, NodeError> {
        let request = OperationRequest::get("/account/details");
        let account = self
            .transport
            .send(request.into_http(&self.base_url))
            .await?;
        Ok(account)
    }
}

#[async_trait]
impl ExecutableNode for TerraformCloudNode {
    async fn execute(&self, item: &Item, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let params = &ctx.parameters;
        let operation = selected_operation(item, ctx)?;

        debug!(item = item.index, %operation, "dispatching Terraform Cloud operation");

        let scope = ItemScope {
            transport: self.transport.as_ref(),
            base_url: &self.base_url,
            params,
            index: item.index,
        };

        match operation {
            Operation::Run(op) => run::execute(op, &scope).await,
            Operation::Workspace(op) => workspace::execute(op, &scope).await,
            Operation::ProjectList => organization::list_projects(&scope).await,
            Operation::GithubAppInstallationList => {
                organization::list_github_app_installations(&scope).await
            }
            Operation::Variable(op) => variable::execute(op, &scope).await,
        }
    }

    fn validate_item(&self, item: &Item, ctx: &ExecutionContext) -> Result<(), NodeError> {
        selected_operation(item, ctx).map(|_| ())
    }

    fn error_details(&self, error: &NodeError) -> Option<String> {
        jsonapi::extract_error_details(error)
    }
}

fn selected_operation(item: &Item, ctx: &ExecutionContext) -> Result<Operation, NodeError> {
    let resource = ctx.parameters.string("resource", item.index, "");
    let operation = ctx.parameters.string("operation", item.index, "");
    Operation::resolve(&resource, &operation)
}
