//! Run operations: lifecycle actions, comments, status, listing, plan runs.

use serde_json::Value;

use super::normalize::action_record;
use super::operation::RunOperation;
use super::request::{page_query, ItemScope, OperationRequest};
use crate::jsonapi::ResourceObject;
use crate::NodeError;

pub(crate) async fn execute(op: RunOperation, scope: &ItemScope<'_>) -> Result<Value, NodeError> {
    match op {
        RunOperation::Apply | RunOperation::Cancel | RunOperation::Discard => {
            let run_id = scope.required("runId")?;
            let reason = scope.string("reason", "");
            let response = scope.send(action_request(op, &run_id, &reason)).await?;
            Ok(action_record("runId", &run_id, op.as_str(), &response))
        }
        RunOperation::AddComment => {
            let run_id = scope.required("runId")?;
            let comment = scope.required("comment")?;
            let response = scope.send(comment_request(&run_id, &comment)).await?;
            Ok(action_record("runId", &run_id, op.as_str(), &response))
        }
        RunOperation::GetStatus => {
            let run_id = scope.required("runId")?;
            scope.send(OperationRequest::get(format!("/runs/{run_id}"))).await
        }
        RunOperation::List => {
            let workspace_id = scope.required("workspaceId")?;
            let options = scope.options("options");
            let request = OperationRequest::get(format!("/workspaces/{workspace_id}/runs"))
                .queries(page_query(&options, false));
            scope.send(request).await
        }
        RunOperation::CreatePlan | RunOperation::CreatePlanManualApply => {
            let workspace_id = scope.required("workspaceId")?;
            let message = scope.required("message")?;
            scope.send(plan_request(op, &workspace_id, &message)).await
        }
    }
}

/// Comment sent when the user gives no reason.
pub fn default_comment(action: RunOperation) -> &'static str {
    match action {
        RunOperation::Cancel => "Cancelled from n8n",
        RunOperation::Discard => "Discarded from n8n",
        _ => "Applied from n8n",
    }
}

/// `POST /runs/{id}/actions/{action}` with `{comment}`. These endpoints answer
/// without a body, so the full envelope is requested.
pub fn action_request(action: RunOperation, run_id: &str, reason: &str) -> OperationRequest {
    let comment = if reason.trim().is_empty() {
        default_comment(action)
    } else {
        reason
    };
    OperationRequest::post(
        format!("/runs/{run_id}/actions/{}", action.as_str()),
        serde_json::json!({ "comment": comment }),
    )
    .full_response()
}

pub fn comment_request(run_id: &str, comment: &str) -> OperationRequest {
    let body = ResourceObject::new("comments")
        .attribute("body", comment)
        .into_document();
    OperationRequest::post(format!("/runs/{run_id}/comments"), body).full_response()
}

/// Speculative (`plan-only`) or manual-apply run on a workspace.
pub fn plan_request(op: RunOperation, workspace_id: &str, message: &str) -> OperationRequest {
    let run = ResourceObject::new("runs").attribute("message", message);
    let run = match op {
        RunOperation::CreatePlanManualApply => run.attribute("auto-apply", false),
        _ => run.attribute("plan-only", true),
    };
    let body = run
        .relationship("workspace", "workspaces", workspace_id)
        .into_document();
    OperationRequest::post("/runs", body)
}
