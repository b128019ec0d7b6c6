//! Session lifecycle endpoints
//!
//! Sign-in is the one place a credential pair enters the store; sign-out is
//! the cooperative way it leaves. Everything in between is the refresh
//! pipeline's business.

use crate::client::{FoodshareClient, RequestPolicy};
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use foodshare_auth::AuthEvent;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Session lifecycle API interface
#[derive(Clone)]
pub struct SessionApi {
    client: FoodshareClient,
}

impl SessionApi {
    /// Create a new session API interface
    pub(crate) fn new(client: FoodshareClient) -> Self {
        Self { client }
    }

    /// Sign in with email and password, persisting the issued credential pair
    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<SessionData> {
        let body = SignInRequest { email, password };
        let envelope: SignInResponse = self
            .client
            .post("auth/login", &body, RequestPolicy::public())
            .await?;

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "sign in rejected".to_string());
            return Err(ApiError::rejected(message));
        }
        let session = envelope
            .data
            .ok_or_else(|| ApiError::rejected("sign in response missing data"))?;

        self.client
            .tokens()
            .set_tokens(&session.access_token, &session.refresh_token)
            .await;

        Ok(session)
    }

    /// End the session
    ///
    /// The server revocation is best-effort: local credentials are cleared
    /// and the logout event emitted regardless, and the server outcome is
    /// returned for callers that care.
    pub async fn sign_out(&self) -> ApiResult<()> {
        let result: ApiResult<serde_json::Value> = self
            .client
            .post_empty("auth/logout", RequestPolicy::authorized())
            .await;

        if let Err(ref error) = result {
            warn!(error = %error, "logout request failed, clearing local session anyway");
        }

        self.client.tokens().clear().await;
        self.client.events().emit(&AuthEvent::Logout {
            reason: Some("signed out".to_string()),
        });

        result.map(|_| ())
    }

    /// Run a refresh cycle outside the 401 path, for diagnostics
    ///
    /// Joins the in-flight cycle if there is one. Returns the new access
    /// token.
    pub async fn force_refresh(&self) -> ApiResult<String> {
        Ok(self.client.refresh_coordinator().begin_or_join().await?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    success: bool,
    message: Option<String>,
    data: Option<SessionData>,
}

/// Issued credentials plus a summary of the signed-in account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Bearer token for authorized calls
    pub access_token: String,
    /// Long-lived token used to renew the session
    pub refresh_token: String,
    /// Signed-in account
    pub user: UserSummary,
    /// Access token expiry, when the server provides one
    pub expires_at: Option<DateTime<Utc>>,
}

/// Minimal account info returned at sign-in
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Account identifier
    pub id: String,
    /// Account email
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_request_uses_camel_case() {
        let body = serde_json::to_value(SignInRequest {
            email: "user@example.com",
            password: "hunter2",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "email": "user@example.com", "password": "hunter2" })
        );
    }

    #[test]
    fn test_session_data_deserialize() {
        let json = r#"{
            "success": true,
            "message": "Welcome back",
            "data": {
                "accessToken": "T1",
                "refreshToken": "R1",
                "user": { "id": "u1", "email": "user@example.com" },
                "expiresAt": "2025-06-01T12:00:00Z"
            }
        }"#;

        let response: SignInResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        let session = response.data.unwrap();
        assert_eq!(session.access_token, "T1");
        assert_eq!(session.refresh_token, "R1");
        assert_eq!(session.user.email, "user@example.com");
        assert!(session.expires_at.is_some());
    }

    #[test]
    fn test_session_data_without_expiry() {
        let json = r#"{
            "success": true,
            "message": null,
            "data": {
                "accessToken": "T1",
                "refreshToken": "R1",
                "user": { "id": "u1", "email": "user@example.com" }
            }
        }"#;

        let response: SignInResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.unwrap().expires_at, None);
    }
}
