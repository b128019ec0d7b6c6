//! Sign-out command

use crate::context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonSignOutOutput {
    signed_out: bool,
    revoked: bool,
}

/// Sign out, revoking the session server-side and clearing it locally
///
/// The local credentials are cleared even when revocation fails, so this
/// command only warns about a failed server call instead of erroring.
pub async fn run(store_dir: Option<&Path>, format: &str) -> Result<()> {
    let tokens = context::token_store(store_dir);
    let client = context::client(tokens)?;

    let revoked = match client.session().sign_out().await {
        Ok(()) => true,
        Err(e) => {
            if format != "json" {
                println!("  {} Revocation failed: {e}", "⚠".yellow().bold());
            }
            false
        }
    };

    if format == "json" {
        let output = JsonSignOutOutput {
            signed_out: true,
            revoked,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("  {} Signed out", "✓".green().bold());

    Ok(())
}
