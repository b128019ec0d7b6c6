//! Health check endpoints

use crate::client::{FoodshareClient, RequestPolicy};
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};

/// Health check API interface
#[derive(Clone)]
pub struct HealthApi {
    client: FoodshareClient,
}

impl HealthApi {
    /// Create a new health API interface
    pub(crate) fn new(client: FoodshareClient) -> Self {
        Self { client }
    }

    /// Check health of the API
    ///
    /// A public call: no bearer is attached, which makes this the quickest
    /// way to verify connectivity independent of session state.
    pub async fn check(&self) -> ApiResult<HealthResponse> {
        self.client.get("health", RequestPolicy::public()).await
    }
}

/// Health check response from the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy", "ok")
    pub status: String,
    /// API version
    pub version: Option<String>,
    /// Timestamp of the health check
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_deserialize() {
        let json = r#"{
            "status": "healthy",
            "version": "1.0.0",
            "timestamp": "2025-06-01T00:00:00Z"
        }"#;

        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, "healthy");
        assert_eq!(response.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_health_response_minimal() {
        let response: HealthResponse = serde_json::from_str(r#"{ "status": "ok" }"#).unwrap();
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, None);
    }
}
