//! Refresh command - force a token refresh round trip

use crate::context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonRefreshOutput {
    refreshed: bool,
    access_token: String,
}

/// Refresh the session and persist the new access token
pub async fn run(store_dir: Option<&Path>, format: &str) -> Result<()> {
    let tokens = context::token_store(store_dir);
    let client = context::client(tokens)?;

    let access = client.session().force_refresh().await?;

    if format == "json" {
        let output = JsonRefreshOutput {
            refreshed: true,
            access_token: context::preview(&access),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "  {} Session refreshed {}",
        "✓".green().bold(),
        context::preview(&access).dimmed()
    );

    Ok(())
}
