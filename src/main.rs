use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use catalog_batch::catalog::{BatchClient, Operation};
use catalog_batch::config;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Submit a batch of catalog item operations and report the outcome"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// JSON file holding an array of `{ "method", "data" }` operations
    #[arg(long)]
    operations: PathBuf,

    /// Let the service create items that do not exist yet
    #[arg(long)]
    upsert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let token = std::env::var("CATALOG_ACCESS_TOKEN")
        .ok()
        .or_else(|| cfg.catalog.access_token.clone())
        .ok_or_else(|| {
            anyhow!("no access token: set CATALOG_ACCESS_TOKEN or catalog.access_token")
        })?;

    let raw = tokio::fs::read(&args.operations)
        .await
        .with_context(|| format!("failed to read {}", args.operations.display()))?;
    let operations: Vec<Operation> =
        serde_json::from_slice(&raw).context("invalid operations JSON")?;

    let client = BatchClient::from_config(&cfg.catalog);
    info!(
        endpoint = client.endpoint(),
        operations = operations.len(),
        upsert = args.upsert,
        "submitting catalog batch"
    );

    let response = if args.upsert {
        client.send_upsert(&operations, &token).await
    } else {
        client.send(&operations, &token).await
    }
    .context("catalog batch failed")?;

    for (retailer_id, warning) in response.warnings() {
        warn!(retailer_id, %warning, "catalog warning");
    }
    for handle in &response.handles {
        println!("{}", handle);
    }
    info!(handles = response.handles.len(), "catalog batch accepted");
    Ok(())
}
