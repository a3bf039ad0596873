//! Workspace operations.
//!
//! Create and update share one attribute builder with sparse semantics: an
//! attribute is only sent when the user set the matching option, so a PATCH
//! never resets fields it was not asked to touch.

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::normalize::action_record;
use super::operation::WorkspaceOperation;
use super::request::{page_query, ItemScope, OperationRequest};
use super::variable::{self, VariableAttributes};
use crate::jsonapi::{self, ResourceObject};
use crate::params::OptionBag;
use crate::NodeError;

/// Options collection used by create and update.
const OPTIONS_PARAM: &str = "workspaceOptions";

/// Sub-fields of `vcsRepo` that make the VCS block worth sending. `authType`
/// alone does not count.
const VCS_FIELDS: [&str; 7] = [
    "identifier",
    "branch",
    "defaultBranch",
    "oauthTokenId",
    "githubAppInstallationId",
    "ingressSubmodules",
    "tagsRegex",
];

pub(crate) async fn execute(
    op: WorkspaceOperation,
    scope: &ItemScope<'_>,
) -> Result<Value, NodeError> {
    match op {
        WorkspaceOperation::Get => {
            let workspace_id = scope.required("workspaceId")?;
            let request = OperationRequest::get(format!("/workspaces/{workspace_id}"))
                .query("include", "current_run,latest_run");
            scope.send(request).await
        }
        WorkspaceOperation::List => {
            let organization = scope.required("organization")?;
            let options = scope.options("options");
            let request = OperationRequest::get(format!("/organizations/{organization}/workspaces"))
                .queries(page_query(&options, true));
            scope.send(request).await
        }
        WorkspaceOperation::Create => create(scope).await,
        WorkspaceOperation::Update => update(scope).await,
        WorkspaceOperation::Delete => {
            let workspace_id = scope.required("workspaceId")?;
            let request = OperationRequest::delete(format!("/workspaces/{workspace_id}")).full_response();
            let response = scope.send(request).await?;
            Ok(action_record("workspaceId", &workspace_id, "delete", &response))
        }
        WorkspaceOperation::GetState => get_state(scope).await,
    }
}

// ---------------------------------------------------------------------------
// Attribute assembly
// ---------------------------------------------------------------------------

/// Attributes plus the optional project relationship.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceSettings {
    pub attributes: Map<String, Value>,
    pub project_id: Option<String>,
}

impl WorkspaceSettings {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.project_id.is_none()
    }

    fn into_resource(self, resource: ResourceObject) -> ResourceObject {
        let resource = resource.attributes(self.attributes);
        match self.project_id {
            Some(project_id) => resource.relationship("project", "projects", project_id),
            None => resource,
        }
    }
}

/// How the VCS connection authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsAuth {
    OAuth { token_id: String },
    GithubApp { installation_id: String },
}

/// Build workspace attributes from the options bag.
pub fn build_settings(options: &OptionBag) -> Result<WorkspaceSettings, NodeError> {
    let mut attributes = Map::new();

    let strings = [
        ("description", "description"),
        ("terraformVersion", "terraform-version"),
        ("workingDirectory", "working-directory"),
        ("executionMode", "execution-mode"),
        ("agentPoolId", "agent-pool-id"),
    ];
    for (option, attribute) in strings {
        if let Some(value) = options.string(option) {
            attributes.insert(attribute.into(), Value::String(value));
        }
    }

    let flags = [
        ("autoApply", "auto-apply"),
        ("autoApplyRunTrigger", "auto-apply-run-trigger"),
        ("queueAllRuns", "queue-all-runs"),
        ("globalRemoteState", "global-remote-state"),
        ("speculativeEnabled", "speculative-enabled"),
    ];
    for (option, attribute) in flags {
        if let Some(value) = options.boolean(option) {
            attributes.insert(attribute.into(), Value::Bool(value));
        }
    }

    if let Some(mode) = options.string("automaticRunTriggering") {
        let file_triggers = match mode.as_str() {
            "always" => false,
            "fileChanges" => true,
            other => {
                return Err(NodeError::validation(format!(
                    "Unknown automatic run triggering mode '{other}'"
                )))
            }
        };
        attributes.insert("file-triggers-enabled".into(), Value::Bool(file_triggers));
    }

    let lists = [
        ("tagNames", "tag-names"),
        ("triggerPrefixes", "trigger-prefixes"),
        ("triggerPatterns", "trigger-patterns"),
    ];
    for (option, attribute) in lists {
        let entries = options
            .string(option)
            .map(|raw| split_list(&raw))
            .unwrap_or_default();
        if !entries.is_empty() {
            attributes.insert(attribute.into(), json!(entries));
        }
    }

    if options.string("executionMode").as_deref() == Some("agent")
        && options.string("agentPoolId").is_none()
    {
        return Err(NodeError::validation(
            "Agent pool ID is required when execution mode is agent",
        ));
    }

    if let Some(vcs) = build_vcs_repo(&options.bag("vcsRepo"))? {
        attributes.insert("vcs-repo".into(), Value::Object(vcs));
    }

    Ok(WorkspaceSettings {
        attributes,
        project_id: options.string("projectId"),
    })
}

/// Split a comma-separated option, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `vcs-repo` attribute, or `None` when no VCS sub-field is set.
pub fn build_vcs_repo(vcs: &OptionBag) -> Result<Option<Map<String, Value>>, NodeError> {
    let configured = VCS_FIELDS.iter().any(|field| match vcs.raw(field) {
        Some(Value::Bool(_)) => true,
        Some(_) => vcs.string(field).is_some(),
        None => false,
    });
    if !configured {
        return Ok(None);
    }

    let identifier = vcs.string("identifier").ok_or_else(|| {
        NodeError::validation("VCS repo identifier is required when configuring a VCS repo")
    })?;

    let mut repo = Map::new();
    repo.insert("identifier".into(), Value::String(identifier));
    if let Some(branch) = vcs.string("branch").or_else(|| vcs.string("defaultBranch")) {
        repo.insert("branch".into(), Value::String(branch));
    }
    if let Some(ingress) = vcs.boolean("ingressSubmodules") {
        repo.insert("ingress-submodules".into(), Value::Bool(ingress));
    }
    if let Some(regex) = vcs.string("tagsRegex") {
        repo.insert("tags-regex".into(), Value::String(regex));
    }

    match resolve_vcs_auth(vcs)? {
        VcsAuth::OAuth { token_id } => {
            repo.insert("oauth-token-id".into(), Value::String(token_id));
        }
        VcsAuth::GithubApp { installation_id } => {
            repo.insert(
                "github-app-installation-id".into(),
                Value::String(installation_id),
            );
        }
    }

    Ok(Some(repo))
}

/// An explicit `authType` wins and requires its id. Without one, the single id
/// that is present decides; both or neither is an error.
pub fn resolve_vcs_auth(vcs: &OptionBag) -> Result<VcsAuth, NodeError> {
    let oauth = vcs.string("oauthTokenId");
    let app = vcs.string("githubAppInstallationId");

    match vcs.string("authType").as_deref() {
        Some("oauth") => oauth
            .map(|token_id| VcsAuth::OAuth { token_id })
            .ok_or_else(|| NodeError::validation("OAuth token ID is required for OAuth VCS auth")),
        Some("githubApp") => app
            .map(|installation_id| VcsAuth::GithubApp { installation_id })
            .ok_or_else(|| {
                NodeError::validation(
                    "GitHub App installation ID is required for GitHub App VCS auth",
                )
            }),
        Some(other) => Err(NodeError::validation(format!(
            "Unknown VCS auth type '{other}'"
        ))),
        None => match (oauth, app) {
            (Some(token_id), None) => Ok(VcsAuth::OAuth { token_id }),
            (None, Some(installation_id)) => Ok(VcsAuth::GithubApp { installation_id }),
            (Some(_), Some(_)) => Err(NodeError::validation(
                "Both OAuth token ID and GitHub App installation ID are set; choose an auth type",
            )),
            (None, None) => Err(NodeError::validation(
                "VCS repo needs either an OAuth token ID or a GitHub App installation ID",
            )),
        },
    }
}

/// Variables declared in the options bag, validated up front.
///
/// Accepts the host's `{variable: [...]}` collection shape or a bare array.
pub fn declared_variables(options: &OptionBag) -> Result<Vec<VariableAttributes>, NodeError> {
    let entries = match options.raw("variables") {
        None => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries.clone(),
        Some(Value::Object(collection)) => match collection.get("variable") {
            Some(Value::Array(entries)) => entries.clone(),
            Some(Value::Object(single)) => vec![Value::Object(single.clone())],
            _ => Vec::new(),
        },
        Some(_) => {
            return Err(NodeError::validation(
                "Workspace variables must be a list of variable definitions",
            ))
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let entry = entry.as_object().cloned().ok_or_else(|| {
                NodeError::validation(format!("Variable at index {position} is not an object"))
            })?;
            VariableAttributes::from_entry(&OptionBag(entry), position)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Create / update
// ---------------------------------------------------------------------------

async fn create(scope: &ItemScope<'_>) -> Result<Value, NodeError> {
    let organization = scope.required("organization")?;
    let name = scope.required("name")?;
    let options = scope.options(OPTIONS_PARAM);
    let settings = build_settings(&options)?;
    let variables = declared_variables(&options)?;

    let body = settings
        .into_resource(ResourceObject::new("workspaces").attribute("name", name.as_str()))
        .into_document();
    let mut created = scope
        .send(OperationRequest::post(
            format!("/organizations/{organization}/workspaces"),
            body,
        ))
        .await?;

    let mut created_variables = Vec::with_capacity(variables.len());
    if !variables.is_empty() {
        let workspace_id = jsonapi::document_id(&created).ok_or_else(|| {
            NodeError::validation(format!(
                "Workspace {name} was created but the response has no id; variables were not created"
            ))
        })?;

        for variable in &variables {
            debug!(workspace_id = %workspace_id, key = %variable.key, "creating workspace variable");
            let response = scope
                .send(variable::create_request(&workspace_id, variable))
                .await?;
            created_variables.push(response);
        }
        info!(
            workspace_id = %workspace_id,
            count = created_variables.len(),
            "workspace variables created"
        );
    }

    let created_variables = Value::Array(created_variables);
    match created.as_object_mut() {
        Some(object) => {
            object.insert("createdVariables".into(), created_variables);
            Ok(created)
        }
        None => Ok(json!({ "workspace": created, "createdVariables": created_variables })),
    }
}

async fn update(scope: &ItemScope<'_>) -> Result<Value, NodeError> {
    let workspace_id = scope.required("workspaceId")?;
    let options = scope.options(OPTIONS_PARAM);
    let mut settings = build_settings(&options)?;

    let new_name = scope.string("updateName", "");
    if !new_name.trim().is_empty() {
        settings.attributes.insert("name".into(), Value::String(new_name));
    }
    if settings.is_empty() {
        return Err(NodeError::validation(
            "Nothing to update: set at least one workspace option or a project",
        ));
    }

    let body = settings
        .into_resource(ResourceObject::new("workspaces").with_id(workspace_id.as_str()))
        .into_document();
    scope
        .send(OperationRequest::patch(format!("/workspaces/{workspace_id}"), body))
        .await
}

// ---------------------------------------------------------------------------
// State lookup
// ---------------------------------------------------------------------------

async fn get_state(scope: &ItemScope<'_>) -> Result<Value, NodeError> {
    let workspace_id = if scope.boolean("resolveByName", false) {
        let name = scope.required("workspaceName")?;
        let organization = scope.required("stateOrganization")?;
        let found = scope
            .send(OperationRequest::get(format!(
                "/organizations/{organization}/workspaces/{name}"
            )))
            .await?;
        jsonapi::document_id(&found).ok_or_else(|| {
            NodeError::validation(format!(
                "Workspace {name} in org {organization} not found or missing id"
            ))
        })?
    } else {
        scope.required("workspaceId")?
    };

    let workspace = scope
        .send(OperationRequest::get(format!("/workspaces/{workspace_id}")))
        .await?;
    let workspace_data = workspace.get("data").cloned().unwrap_or(Value::Null);
    let state_version_id = jsonapi::related_id(
        &workspace_data,
        &["current-state-version", "current_state_version"],
    )
    .ok_or_else(|| {
        NodeError::validation(format!(
            "Workspace {workspace_id} has no current state version"
        ))
    })?;

    let state_version = scope
        .send(OperationRequest::get(format!("/state-versions/{state_version_id}")))
        .await?;
    let state_version_data = state_version.get("data").cloned().unwrap_or_else(|| json!({}));
    let download_url = jsonapi::attribute_string(
        &state_version_data,
        &["hosted-state-download-url", "hosted_state_download_url"],
    );

    Ok(json!({
        "workspaceId": workspace_id,
        "stateVersionId": state_version_id,
        "downloadUrl": download_url,
        "stateVersion": state_version_data,
    }))
}
