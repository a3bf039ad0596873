//! Organization-scoped listings: projects and GitHub App installations.

use serde_json::Value;

use super::request::{page_query, ItemScope, OperationRequest};
use crate::NodeError;

pub(crate) async fn list_projects(scope: &ItemScope<'_>) -> Result<Value, NodeError> {
    let organization = scope.required("organization")?;
    let options = scope.options("options");
    let request = OperationRequest::get(format!("/organizations/{organization}/projects"))
        .queries(page_query(&options, true));
    scope.send(request).await
}

/// Installations only page; there is no search filter.
pub(crate) async fn list_github_app_installations(
    scope: &ItemScope<'_>,
) -> Result<Value, NodeError> {
    let organization = scope.required("organization")?;
    let options = scope.options("options");
    let request = OperationRequest::get(format!(
        "/organizations/{organization}/github-app-installations"
    ))
    .queries(page_query(&options, false));
    scope.send(request).await
}
