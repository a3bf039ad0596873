//! End-to-end tests for the Terraform Cloud node against `MockTransport`.
//!
//! Every test inspects the recorded requests, so nothing touches the network.

use std::sync::Arc;

use serde_json::{json, Value};

use nodes::mock::MockTransport;
use nodes::terraform::TerraformCloudNode;
use nodes::{ExecutableNode, ExecutionContext, HttpMethod, Item, NodeError, NodeParameters};

const BASE: &str = "https://app.terraform.io/api/v2";

fn ctx(params: Value) -> ExecutionContext {
    ExecutionContext::new(NodeParameters::new(params.as_object().unwrap().clone()))
}

fn node(transport: &Arc<MockTransport>) -> TerraformCloudNode {
    TerraformCloudNode::new(transport.clone())
}

async fn run_item(transport: &Arc<MockTransport>, params: Value) -> Result<Value, NodeError> {
    node(transport).execute(&Item::new(0, json!({})), &ctx(params)).await
}

// ============================================================
// Runs
// ============================================================

#[tokio::test]
async fn apply_without_reason_sends_the_default_comment() {
    let transport = Arc::new(MockTransport::new().respond_full(202, None));

    let out = run_item(
        &transport,
        json!({ "resource": "run", "operation": "apply", "runId": "run-abc", "reason": "" }),
    )
    .await
    .expect("apply should succeed");

    assert_eq!(
        out,
        json!({ "runId": "run-abc", "action": "apply", "statusCode": 202, "response": null })
    );

    let requests = transport.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].url, format!("{BASE}/runs/run-abc/actions/apply"));
    assert_eq!(requests[0].body, Some(json!({ "comment": "Applied from n8n" })));
    assert!(requests[0].full_response);
    assert_eq!(requests[0].header("Content-Type"), Some("application/vnd.api+json"));
}

#[tokio::test]
async fn apply_with_reason_uses_it_as_comment() {
    let transport = Arc::new(MockTransport::new().respond_full(202, None));

    run_item(
        &transport,
        json!({ "resource": "run", "operation": "apply", "runId": "run-abc", "reason": "go" }),
    )
    .await
    .unwrap();

    assert_eq!(transport.recorded()[0].body, Some(json!({ "comment": "go" })));
}

#[tokio::test]
async fn cancel_and_discard_use_their_own_defaults() {
    let transport = Arc::new(
        MockTransport::new()
            .respond_full(202, None)
            .respond_full(202, None),
    );
    let node = node(&transport);

    for op in ["cancel", "discard"] {
        node.execute(
            &Item::new(0, json!({})),
            &ctx(json!({ "resource": "run", "operation": op, "runId": "run-1" })),
        )
        .await
        .unwrap();
    }

    let requests = transport.recorded();
    assert_eq!(requests[0].url, format!("{BASE}/runs/run-1/actions/cancel"));
    assert_eq!(requests[0].body, Some(json!({ "comment": "Cancelled from n8n" })));
    assert_eq!(requests[1].url, format!("{BASE}/runs/run-1/actions/discard"));
    assert_eq!(requests[1].body, Some(json!({ "comment": "Discarded from n8n" })));
}

#[tokio::test]
async fn add_comment_reports_the_created_comment() {
    let comment = json!({ "data": { "id": "wsc-1", "type": "comments" } });
    let transport = Arc::new(MockTransport::new().respond_full(201, Some(comment.clone())));

    let out = run_item(
        &transport,
        json!({ "resource": "run", "operation": "addComment", "runId": "run-1", "comment": "ship it" }),
    )
    .await
    .unwrap();

    assert_eq!(out["statusCode"], 201);
    assert_eq!(out["response"], comment);
    assert_eq!(
        transport.recorded()[0].body,
        Some(json!({ "data": { "type": "comments", "attributes": { "body": "ship it" } } }))
    );
}

#[tokio::test]
async fn run_id_is_required_before_any_request() {
    let transport = Arc::new(MockTransport::new());

    let err = run_item(&transport, json!({ "resource": "run", "operation": "getStatus" }))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn get_status_returns_the_body_unchanged() {
    let run = json!({ "data": { "id": "run-1", "attributes": { "status": "planned" } } });
    let transport = Arc::new(MockTransport::new().respond(run.clone()));

    let out = run_item(
        &transport,
        json!({ "resource": "run", "operation": "getStatus", "runId": "run-1" }),
    )
    .await
    .unwrap();

    assert_eq!(out, run);
    assert_eq!(transport.recorded()[0].method, HttpMethod::Get);
    assert!(!transport.recorded()[0].full_response);
}

#[tokio::test]
async fn run_list_passes_paging_through() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": [] })));

    run_item(
        &transport,
        json!({
            "resource": "run",
            "operation": "list",
            "workspaceId": "ws-1",
            "options": { "pageNumber": 3, "pageSize": 10 }
        }),
    )
    .await
    .unwrap();

    let request = &transport.recorded()[0];
    assert_eq!(request.url, format!("{BASE}/workspaces/ws-1/runs"));
    assert_eq!(request.query_value("page[number]"), Some("3"));
    assert_eq!(request.query_value("page[size]"), Some("10"));
    assert_eq!(request.query_value("search[generic]"), None);
}

#[tokio::test]
async fn create_plan_posts_a_plan_only_run() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": { "id": "run-new" } })));

    let out = run_item(
        &transport,
        json!({ "resource": "run", "operation": "createPlan", "workspaceId": "ws-1", "message": "check drift" }),
    )
    .await
    .unwrap();

    assert_eq!(out["data"]["id"], "run-new");
    let request = &transport.recorded()[0];
    assert_eq!(request.url, format!("{BASE}/runs"));
    let data = &request.body.as_ref().unwrap()["data"];
    assert_eq!(data["attributes"]["plan-only"], true);
    assert_eq!(data["relationships"]["workspace"]["data"]["id"], "ws-1");
}

// ============================================================
// Workspaces
// ============================================================

#[tokio::test]
async fn workspace_get_includes_current_and_latest_run() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": { "id": "ws-1" } })));

    run_item(
        &transport,
        json!({ "resource": "workspace", "operation": "get", "workspaceId": "ws-1" }),
    )
    .await
    .unwrap();

    let request = &transport.recorded()[0];
    assert_eq!(request.url, format!("{BASE}/workspaces/ws-1"));
    assert_eq!(request.query_value("include"), Some("current_run,latest_run"));
}

#[tokio::test]
async fn workspace_list_supports_search() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": [] })));

    run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "list",
            "organization": "acme",
            "options": { "search": "prod" }
        }),
    )
    .await
    .unwrap();

    let request = &transport.recorded()[0];
    assert_eq!(request.url, format!("{BASE}/organizations/acme/workspaces"));
    assert_eq!(request.query_value("search[generic]"), Some("prod"));
}

#[tokio::test]
async fn workspace_create_adds_variables_in_order() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(json!({ "data": { "id": "ws-new", "type": "workspaces" } }))
            .respond(json!({ "data": { "id": "var-1" } }))
            .respond(json!({ "data": { "id": "var-2" } })),
    );

    let out = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "create",
            "organization": "acme",
            "name": "networking",
            "workspaceOptions": {
                "tagNames": "a, b ,,c",
                "projectId": "prj-1",
                "vcsRepo": { "identifier": "acme/networking", "oauthTokenId": "ot-1" },
                "variables": {
                    "variable": [
                        { "key": "region", "value": "eu-west-1" },
                        { "key": "AWS_PROFILE", "value": "ops", "category": "env", "sensitive": true }
                    ]
                }
            }
        }),
    )
    .await
    .unwrap();

    let requests = transport.recorded();
    assert_eq!(requests.len(), 3);

    assert_eq!(requests[0].url, format!("{BASE}/organizations/acme/workspaces"));
    let data = &requests[0].body.as_ref().unwrap()["data"];
    assert_eq!(data["type"], "workspaces");
    assert_eq!(data["attributes"]["name"], "networking");
    assert_eq!(data["attributes"]["tag-names"], json!(["a", "b", "c"]));
    assert_eq!(data["attributes"]["vcs-repo"]["oauth-token-id"], "ot-1");
    assert_eq!(data["relationships"]["project"]["data"]["id"], "prj-1");

    assert_eq!(requests[1].url, format!("{BASE}/workspaces/ws-new/vars"));
    assert_eq!(requests[1].body.as_ref().unwrap()["data"]["attributes"]["key"], "region");
    assert_eq!(requests[2].body.as_ref().unwrap()["data"]["attributes"]["key"], "AWS_PROFILE");
    assert_eq!(requests[2].body.as_ref().unwrap()["data"]["attributes"]["category"], "env");

    assert_eq!(out["data"]["id"], "ws-new");
    assert_eq!(
        out["createdVariables"],
        json!([{ "data": { "id": "var-1" } }, { "data": { "id": "var-2" } }])
    );
}

#[tokio::test]
async fn ambiguous_vcs_auth_fails_before_any_request() {
    let transport = Arc::new(MockTransport::new());

    let err = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "create",
            "organization": "acme",
            "name": "networking",
            "workspaceOptions": {
                "vcsRepo": {
                    "identifier": "acme/networking",
                    "oauthTokenId": "ot-1",
                    "githubAppInstallationId": "ghain-1"
                }
            }
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn variable_without_value_fails_before_any_request() {
    let transport = Arc::new(MockTransport::new());

    let err = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "create",
            "organization": "acme",
            "name": "networking",
            "workspaceOptions": {
                "variables": { "variable": [ { "key": "ok", "value": "1" }, { "key": "broken" } ] }
            }
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("index 1"), "{err}");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn created_workspace_without_id_cannot_receive_variables() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": {} })));

    let err = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "create",
            "organization": "acme",
            "name": "networking",
            "workspaceOptions": { "variables": [ { "key": "a", "value": "1" } ] }
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn workspace_update_without_changes_is_rejected() {
    let transport = Arc::new(MockTransport::new());

    let err = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "update",
            "workspaceId": "ws-1",
            "workspaceOptions": { "tagNames": " , " }
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn workspace_update_sends_only_what_changed() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": { "id": "ws-1" } })));

    run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "update",
            "workspaceId": "ws-1",
            "updateName": "networking-v2",
            "workspaceOptions": { "projectId": "prj-9" }
        }),
    )
    .await
    .unwrap();

    let request = &transport.recorded()[0];
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.url, format!("{BASE}/workspaces/ws-1"));
    assert_eq!(
        request.body.as_ref().unwrap(),
        &json!({
            "data": {
                "type": "workspaces",
                "id": "ws-1",
                "attributes": { "name": "networking-v2" },
                "relationships": { "project": { "data": { "type": "projects", "id": "prj-9" } } }
            }
        })
    );
}

#[tokio::test]
async fn workspace_delete_reports_the_status() {
    let transport = Arc::new(MockTransport::new().respond_full(204, None));

    let out = run_item(
        &transport,
        json!({ "resource": "workspace", "operation": "delete", "workspaceId": "ws-1" }),
    )
    .await
    .unwrap();

    assert_eq!(
        out,
        json!({ "workspaceId": "ws-1", "action": "delete", "statusCode": 204, "response": null })
    );
    assert_eq!(transport.recorded()[0].method, HttpMethod::Delete);
}

#[tokio::test]
async fn get_state_resolves_by_name_and_follows_the_chain() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(json!({ "data": { "id": "ws-42" } }))
            .respond(json!({
                "data": {
                    "id": "ws-42",
                    "relationships": { "current_state_version": { "data": { "id": "sv-7" } } }
                }
            }))
            .respond(json!({
                "data": {
                    "id": "sv-7",
                    "attributes": { "hosted_state_download_url": "https://archivist.test/sv-7" }
                }
            })),
    );

    let out = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "getState",
            "resolveByName": true,
            "workspaceName": "networking",
            "stateOrganization": "acme"
        }),
    )
    .await
    .unwrap();

    let urls: Vec<String> = transport.recorded().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            format!("{BASE}/organizations/acme/workspaces/networking"),
            format!("{BASE}/workspaces/ws-42"),
            format!("{BASE}/state-versions/sv-7"),
        ]
    );
    assert_eq!(out["workspaceId"], "ws-42");
    assert_eq!(out["stateVersionId"], "sv-7");
    assert_eq!(out["downloadUrl"], "https://archivist.test/sv-7");
    assert_eq!(out["stateVersion"]["id"], "sv-7");
}

#[tokio::test]
async fn get_state_stops_when_the_name_does_not_resolve() {
    let transport = Arc::new(MockTransport::new().respond(json!({ "data": {} })));

    let err = run_item(
        &transport,
        json!({
            "resource": "workspace",
            "operation": "getState",
            "resolveByName": true,
            "workspaceName": "ghost",
            "stateOrganization": "acme"
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_validation());
    let message = err.to_string();
    assert!(message.contains("ghost") && message.contains("acme"), "{message}");
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn get_state_requires_a_current_state_version() {
    let transport = Arc::new(
        MockTransport::new().respond(json!({ "data": { "id": "ws-1", "relationships": {} } })),
    );

    let err = run_item(
        &transport,
        json!({ "resource": "workspace", "operation": "getState", "workspaceId": "ws-1" }),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("no current state version"));
    assert_eq!(transport.request_count(), 1);
}

// ============================================================
// Variables, projects, installations
// ============================================================

#[tokio::test]
async fn variable_crud_targets_the_vars_endpoints() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(json!({ "data": { "id": "var-1" } }))
            .respond(json!({ "data": { "id": "var-1" } }))
            .respond_full(204, None),
    );
    let node = node(&transport);
    let item = Item::new(0, json!({}));

    node.execute(
        &item,
        &ctx(json!({
            "resource": "variable", "operation": "create", "workspaceId": "ws-1",
            "key": "region", "value": "eu-west-1", "category": "terraform", "hcl": false, "sensitive": false
        })),
    )
    .await
    .unwrap();
    node.execute(
        &item,
        &ctx(json!({
            "resource": "variable", "operation": "update", "variableId": "var-1",
            "key": "region", "value": "us-east-1", "category": "env", "sensitive": true
        })),
    )
    .await
    .unwrap();
    let deleted = node
        .execute(
            &item,
            &ctx(json!({ "resource": "variable", "operation": "delete", "variableId": "var-1" })),
        )
        .await
        .unwrap();

    let requests = transport.recorded();
    assert_eq!(requests[0].url, format!("{BASE}/workspaces/ws-1/vars"));
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[1].url, format!("{BASE}/vars/var-1"));
    assert_eq!(requests[1].method, HttpMethod::Patch);
    assert_eq!(requests[1].body.as_ref().unwrap()["data"]["attributes"]["category"], "env");
    assert_eq!(requests[2].method, HttpMethod::Delete);
    assert_eq!(deleted["statusCode"], 204);
    assert_eq!(deleted["variableId"], "var-1");
}

#[tokio::test]
async fn variable_create_requires_a_value() {
    let transport = Arc::new(MockTransport::new());

    let err = run_item(
        &transport,
        json!({ "resource": "variable", "operation": "create", "workspaceId": "ws-1", "key": "region" }),
    )
    .await
    .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn organization_listings_use_their_endpoints() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(json!({ "data": [] }))
            .respond(json!({ "data": [] })),
    );
    let node = node(&transport);
    let item = Item::new(0, json!({}));

    node.execute(
        &item,
        &ctx(json!({
            "resource": "project", "operation": "list", "organization": "acme",
            "options": { "search": "core", "pageSize": 5 }
        })),
    )
    .await
    .unwrap();
    node.execute(
        &item,
        &ctx(json!({
            "resource": "githubAppInstallation", "operation": "list", "organization": "acme",
            "options": { "pageNumber": 2, "search": "ignored" }
        })),
    )
    .await
    .unwrap();

    let requests = transport.recorded();
    assert_eq!(requests[0].url, format!("{BASE}/organizations/acme/projects"));
    assert_eq!(requests[0].query_value("search[generic]"), Some("core"));
    assert_eq!(requests[0].query_value("page[size]"), Some("5"));
    assert_eq!(
        requests[1].url,
        format!("{BASE}/organizations/acme/github-app-installations")
    );
    assert_eq!(requests[1].query_value("page[number]"), Some("2"));
    assert_eq!(requests[1].query_value("search[generic]"), None);
}

// ============================================================
// Errors and credentials
// ============================================================

#[tokio::test]
async fn unknown_operation_is_unsupported() {
    let transport = Arc::new(MockTransport::new());

    let err = run_item(&transport, json!({ "resource": "run", "operation": "explode" }))
        .await
        .unwrap_err();

    assert!(err.is_unsupported());
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn validate_item_checks_the_selector_offline() {
    let transport = Arc::new(MockTransport::new());
    let node = node(&transport);
    let item = Item::new(0, json!({}));

    assert!(node
        .validate_item(&item, &ctx(json!({ "resource": "variable" })))
        .is_ok());
    let err = node
        .validate_item(&item, &ctx(json!({ "resource": "stack", "operation": "list" })))
        .unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn upstream_errors_expose_json_api_details() {
    let transport = Arc::new(MockTransport::new().respond_status(
        422,
        Some(json!({
            "errors": [
                { "status": "422", "title": "invalid attribute", "detail": "Name has already been taken" }
            ]
        })),
    ));
    let node = node(&transport);

    let err = node
        .execute(
            &Item::new(0, json!({})),
            &ctx(json!({ "resource": "workspace", "operation": "create", "organization": "acme", "name": "dup" })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NodeError::Upstream(_)));
    assert_eq!(
        node.error_details(&err).as_deref(),
        Some("Name has already been taken")
    );
}

#[tokio::test]
async fn verify_credentials_reads_account_details() {
    let transport = Arc::new(
        MockTransport::new().respond(json!({ "data": { "attributes": { "username": "ops" } } })),
    );
    let node = node(&transport).with_base_url("https://tfe.example.test/api/v2/");

    let account = node.verify_credentials().await.unwrap();

    assert_eq!(account["data"]["attributes"]["username"], "ops");
    let request = &transport.recorded()[0];
    assert_eq!(request.url, "https://tfe.example.test/api/v2/account/details");
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.header("Accept"), Some("application/vnd.api+json"));
}
