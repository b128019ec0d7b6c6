//! Health check command

use crate::context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonHealthOutput {
    status: String,
    version: Option<String>,
}

/// Check that the configured API is reachable and healthy
pub async fn run(store_dir: Option<&Path>, format: &str) -> Result<()> {
    let tokens = context::token_store(store_dir);
    let client = context::client(tokens)?;

    let base_url = client.base_url().to_string();
    let health = client.health().check().await?;

    if format == "json" {
        let output = JsonHealthOutput {
            status: health.status,
            version: health.version,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  API:     {}", base_url);
    if health.status == "ok" {
        match &health.version {
            Some(version) => println!("  Service: {} (v{version})", "✓ Healthy".green()),
            None => println!("  Service: {}", "✓ Healthy".green()),
        }
    } else {
        println!("  Service: {} ({})", "✗ Unhealthy".red(), health.status);
    }
    println!();

    Ok(())
}
