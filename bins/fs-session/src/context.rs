//! Shared wiring for commands

use anyhow::Result;
use foodshare_api_client::{ClientConfig, FoodshareClient};
use foodshare_auth::{FileKeyValueStore, TokenStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Open the persisted token store, honoring `--store-dir`
pub fn token_store(store_dir: Option<&Path>) -> TokenStore {
    match store_dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "opening session store");
            TokenStore::new(Arc::new(FileKeyValueStore::new(dir)))
        }
        None => TokenStore::on_device(),
    }
}

/// Build a client over the given store using environment configuration
pub fn client(tokens: TokenStore) -> Result<FoodshareClient> {
    let config = ClientConfig::from_env()?;
    Ok(FoodshareClient::with_config(config, tokens)?)
}

/// Shorten a token for display
pub fn preview(token: &str) -> String {
    match token.get(..8) {
        Some(prefix) => format!("{prefix}…"),
        None => "…".to_string(),
    }
}
