//! Refresh endpoint binding
//!
//! Exchanges the stored refresh token for fresh credentials against
//! `POST <base>/auth/refresh`. Runs on a bare HTTP client so a refresh can
//! never recurse into the 401 handling it exists to serve.

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foodshare_auth::{AuthError, AuthResult, RefreshTransport, RefreshedTokens};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Standard Foodshare API envelope for the refresh endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    success: bool,
    message: Option<String>,
    data: Option<RefreshData>,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
    refresh_token: Option<String>,
}

/// [`RefreshTransport`] against the Foodshare auth service
pub struct RefreshEndpoint {
    http: Client,
    url: String,
}

impl RefreshEndpoint {
    /// Build the transport for the configured base URL
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.refresh_timeout)
            .build()
            .map_err(ApiError::Request)?;
        let url = format!("{}/auth/refresh", config.base_url.trim_end_matches('/'));
        Ok(Self { http, url })
    }
}

#[async_trait]
impl RefreshTransport for RefreshEndpoint {
    async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshedTokens> {
        let response = self
            .http
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| AuthError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AuthError::rejected(format!(
                "HTTP {}: {message}",
                status.as_u16()
            )));
        }

        let envelope: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::network(format!("invalid refresh response: {e}")))?;
        debug!(timestamp = ?envelope.timestamp, "refresh response received");

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "refresh rejected".to_string());
            return Err(AuthError::rejected(message));
        }

        let data = envelope
            .data
            .ok_or_else(|| AuthError::rejected("refresh response missing data"))?;

        Ok(RefreshedTokens {
            access_token: data.access_token,
            refresh_token: data.refresh_token,
        })
    }
}
