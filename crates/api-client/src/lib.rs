//! Session-aware API client for the Foodshare mobile backend
//!
//! This crate provides the HTTP half of the Foodshare client core: a
//! `reqwest`-based client that reads the device token store on the way out
//! and repairs the session on the way back in.
//!
//! # Features
//!
//! - **Environment-based configuration**: Load URLs and timeouts from environment variables
//! - **Bearer injection**: Authorized calls carry the stored access token
//! - **Single-flight refresh**: Concurrent 401s share one refresh round trip
//! - **One retry per request**: A refreshed request is resubmitted exactly once
//! - **Request correlation**: Track requests with unique IDs for debugging
//!
//! # Example
//!
//! ```rust,no_run
//! use foodshare_api_client::{ClientConfig, FoodshareClient};
//! use foodshare_auth::TokenStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FoodshareClient::with_config(
//!         ClientConfig::from_env()?,
//!         TokenStore::on_device(),
//!     )?;
//!
//!     // Public call, no bearer attached
//!     let health = client.health().check().await?;
//!     println!("Service status: {}", health.status);
//!
//!     // Establish a session; the issued pair lands in the token store
//!     let session = client.session().sign_in("user@example.com", "secret").await?;
//!     println!("Signed in as {}", session.user.email);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod refresh;

pub use client::{FoodshareClient, RequestPolicy};
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, ApiResult};
pub use refresh::RefreshEndpoint;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::{FoodshareClient, RequestPolicy};
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::{HealthApi, SessionApi};
    pub use crate::error::{ApiError, ApiResult};
}
