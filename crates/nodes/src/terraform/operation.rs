//! `(resource, operation)` selectors.
//!
//! The host hands both over as strings. They are parsed once per item into a
//! tagged union so that dispatch is an exhaustive `match`.

use std::fmt;
use std::str::FromStr;

use crate::NodeError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resource {
    Run,
    #[default]
    Workspace,
    Project,
    GithubAppInstallation,
    Variable,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Workspace => "workspace",
            Self::Project => "project",
            Self::GithubAppInstallation => "githubAppInstallation",
            Self::Variable => "variable",
        }
    }

    /// Operation used when the item does not name one.
    pub fn default_operation(self) -> &'static str {
        match self {
            Self::Variable => "create",
            _ => "list",
        }
    }
}

impl FromStr for Resource {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Self::Run),
            "workspace" => Ok(Self::Workspace),
            "project" => Ok(Self::Project),
            "githubAppInstallation" => Ok(Self::GithubAppInstallation),
            "variable" => Ok(Self::Variable),
            other => Err(NodeError::UnsupportedResource(other.to_owned())),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOperation {
    Apply,
    Cancel,
    Discard,
    AddComment,
    GetStatus,
    List,
    CreatePlan,
    CreatePlanManualApply,
}

impl RunOperation {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "apply" => Self::Apply,
            "cancel" => Self::Cancel,
            "discard" => Self::Discard,
            "addComment" => Self::AddComment,
            "getStatus" => Self::GetStatus,
            "list" => Self::List,
            "createPlan" => Self::CreatePlan,
            "createPlanManualApply" => Self::CreatePlanManualApply,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Cancel => "cancel",
            Self::Discard => "discard",
            Self::AddComment => "addComment",
            Self::GetStatus => "getStatus",
            Self::List => "list",
            Self::CreatePlan => "createPlan",
            Self::CreatePlanManualApply => "createPlanManualApply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOperation {
    Get,
    List,
    Create,
    Update,
    Delete,
    GetState,
}

impl WorkspaceOperation {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "get" => Self::Get,
            "list" => Self::List,
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "getState" => Self::GetState,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::GetState => "getState",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOperation {
    Create,
    Update,
    Delete,
}

impl VariableOperation {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A resolved selector. Project and GitHub App installation only list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Run(RunOperation),
    Workspace(WorkspaceOperation),
    ProjectList,
    GithubAppInstallationList,
    Variable(VariableOperation),
}

impl Operation {
    /// Parse a selector pair. An empty `operation` falls back to the
    /// resource's default; an empty `resource` means `workspace`.
    pub fn resolve(resource: &str, operation: &str) -> Result<Self, NodeError> {
        let resource = if resource.is_empty() {
            Resource::default()
        } else {
            resource.parse::<Resource>()?
        };
        let operation = if operation.is_empty() {
            resource.default_operation()
        } else {
            operation
        };

        let resolved = match resource {
            Resource::Run => RunOperation::parse(operation).map(Self::Run),
            Resource::Workspace => WorkspaceOperation::parse(operation).map(Self::Workspace),
            Resource::Project => (operation == "list").then_some(Self::ProjectList),
            Resource::GithubAppInstallation => {
                (operation == "list").then_some(Self::GithubAppInstallationList)
            }
            Resource::Variable => VariableOperation::parse(operation).map(Self::Variable),
        };

        resolved.ok_or_else(|| NodeError::UnsupportedOperation {
            resource: resource.as_str().to_owned(),
            operation: operation.to_owned(),
        })
    }

    pub fn resource(self) -> Resource {
        match self {
            Self::Run(_) => Resource::Run,
            Self::Workspace(_) => Resource::Workspace,
            Self::ProjectList => Resource::Project,
            Self::GithubAppInstallationList => Resource::GithubAppInstallation,
            Self::Variable(_) => Resource::Variable,
        }
    }

    pub fn operation_name(self) -> &'static str {
        match self {
            Self::Run(op) => op.as_str(),
            Self::Workspace(op) => op.as_str(),
            Self::ProjectList | Self::GithubAppInstallationList => "list",
            Self::Variable(op) => op.as_str(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource(), self.operation_name())
    }
}
