//! `tfc-node` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`: execute a batch file against Terraform Cloud.
//! - `validate`: check a batch file offline.
//! - `verify-credentials`: check the API token.
//!
//! Records are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use engine::{BatchDefinition, EngineError, ExecutorConfig, NodeExecutor};
use nodes::ReqwestTransport;
use nodes::terraform::config::{parse_timeout, BASE_URL_ENV, TIMEOUT_ENV, TOKEN_ENV};
use nodes::terraform::{ConfigError, TerraformCloudConfig, TerraformCloudNode, DEFAULT_BASE_URL};

#[derive(Parser)]
#[command(
    name = "tfc-node",
    about = "Run Terraform Cloud operations over batches of items",
    version
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Terraform Cloud API token.
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// API base URL, for Terraform Enterprise installs.
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in whole seconds. No limit when unset.
    #[arg(long, global = true, env = TIMEOUT_ENV, value_parser = parse_timeout)]
    timeout_secs: Option<Duration>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a batch file and print one record per item.
    Run {
        /// Path to the batch JSON file.
        path: PathBuf,
        /// Record item failures as `{error}` instead of aborting.
        #[arg(long)]
        continue_on_fail: bool,
    },
    /// Check that every item of a batch file selects a known operation.
    Validate {
        /// Path to the batch JSON file.
        path: PathBuf,
    },
    /// Call `GET /account/details` with the configured token.
    VerifyCredentials,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            path,
            continue_on_fail,
        } => {
            let batch = read_batch(&path)?;
            let node = build_node(&cli.connection)?;
            let executor = NodeExecutor::new(Arc::new(node), ExecutorConfig { continue_on_fail });

            let report = executor.run(batch).await.map_err(|err| {
                if let EngineError::ItemFailed {
                    description: Some(body),
                    ..
                } = &err
                {
                    error!("upstream response: {body}");
                }
                err
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Validate { path } => {
            let batch = read_batch(&path)?;
            // Validation never sends requests, so no token is needed.
            let transport = ReqwestTransport::new(String::new(), None)?;
            let node = TerraformCloudNode::new(Arc::new(transport));
            let executor = NodeExecutor::new(Arc::new(node), ExecutorConfig::default());

            let count = executor
                .validate(batch)
                .with_context(|| format!("{} is not a valid batch", path.display()))?;
            println!("Batch is valid: {count} items");
        }
        Command::VerifyCredentials => {
            let node = build_node(&cli.connection)?;
            info!("verifying credentials against {}", node.base_url());
            let account = node
                .verify_credentials()
                .await
                .context("credential check failed")?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
    }

    Ok(())
}

fn read_batch(path: &Path) -> Result<BatchDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read batch file {}", path.display()))?;
    let batch = serde_json::from_str(&content)
        .with_context(|| format!("invalid batch JSON in {}", path.display()))?;
    Ok(batch)
}

fn build_node(args: &ConnectionArgs) -> Result<TerraformCloudNode> {
    let token = args
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::MissingToken)?;

    let config = TerraformCloudConfig {
        base_url: args.base_url.clone(),
        api_token: token,
        timeout: args.timeout_secs,
    };
    info!("using {config:?}");

    TerraformCloudNode::from_config(&config).context("cannot build HTTP client")
}
