//! Sign-in command

use crate::context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonSignInOutput {
    user_id: String,
    email: String,
    expires_at: Option<String>,
}

/// Sign in and persist the issued credential pair
pub async fn run(email: &str, password: &str, store_dir: Option<&Path>, format: &str) -> Result<()> {
    let tokens = context::token_store(store_dir);
    let client = context::client(tokens)?;

    let session = client.session().sign_in(email, password).await?;

    if format == "json" {
        let output = JsonSignInOutput {
            user_id: session.user.id,
            email: session.user.email,
            expires_at: session.expires_at.map(|t| t.to_rfc3339()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "  {} Signed in as {}",
        "✓".green().bold(),
        session.user.email.bold()
    );
    if let Some(expires_at) = session.expires_at {
        println!("  Session expires at {expires_at}");
    }

    Ok(())
}
