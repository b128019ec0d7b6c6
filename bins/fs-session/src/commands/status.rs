//! Status command - show the session stored on this device

use crate::context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonStatusOutput {
    signed_in: bool,
    access_token: Option<String>,
    refresh_token_present: bool,
}

/// Show which credentials are currently persisted
pub async fn run(store_dir: Option<&Path>, format: &str) -> Result<()> {
    let tokens = context::token_store(store_dir);
    let access = tokens.access_token().await;
    let refresh = tokens.refresh_token().await;

    if format == "json" {
        let output = JsonStatusOutput {
            signed_in: refresh.is_some(),
            access_token: access.as_deref().map(context::preview),
            refresh_token_present: refresh.is_some(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {}", "Session status".blue().bold());
    println!();

    match &access {
        Some(token) => println!(
            "  Access token:  {} {}",
            "✓ present".green(),
            context::preview(token).dimmed()
        ),
        None => println!("  Access token:  {}", "absent".yellow()),
    }
    match &refresh {
        Some(_) => println!("  Refresh token: {}", "✓ present".green()),
        None => println!("  Refresh token: {}", "absent".yellow()),
    }

    println!();
    if refresh.is_some() {
        println!("  {} Signed in", "✓".green().bold());
    } else {
        println!("  Not signed in");
    }
    println!();

    Ok(())
}
