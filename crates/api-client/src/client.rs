//! Session-aware request pipeline
//!
//! Outbound: requests flagged as requiring auth get the stored access token
//! attached as a bearer, and every request carries a correlation ID. Inbound:
//! a 401 on an authorized request triggers the single-flight refresh and one
//! resubmission with the new token; a 401 on a public request is surfaced as
//! an [`AuthEvent::Unauthorized`] instead.

use crate::config::ClientConfig;
use crate::endpoints::{HealthApi, SessionApi};
use crate::error::{ApiError, ApiResult};
use crate::refresh::RefreshEndpoint;
use foodshare_auth::{AuthEvent, AuthEventBus, RefreshCoordinator, TokenStore};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Whether a call needs a signed-in session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Attach the stored access token and run the 401 refresh path
    pub requires_auth: bool,
}

impl RequestPolicy {
    /// Policy for endpoints that accept anonymous calls
    #[must_use]
    pub const fn public() -> Self {
        Self {
            requires_auth: false,
        }
    }

    /// Policy for endpoints that need a signed-in session
    #[must_use]
    pub const fn authorized() -> Self {
        Self {
            requires_auth: true,
        }
    }
}

/// One submission of a request
///
/// Immutable: the resubmission after a refresh is a new attempt carrying the
/// refreshed token, not a mutation of the first one. The ordinal bounds the
/// pipeline to a single retry.
#[derive(Debug, Clone)]
struct Attempt {
    ordinal: u32,
    refreshed_token: Option<String>,
}

impl Attempt {
    fn first() -> Self {
        Self {
            ordinal: 1,
            refreshed_token: None,
        }
    }

    fn retry_with(&self, token: String) -> Self {
        Self {
            ordinal: self.ordinal + 1,
            refreshed_token: Some(token),
        }
    }

    fn is_retry(&self) -> bool {
        self.ordinal > 1
    }
}

/// Foodshare mobile API client with session-aware request handling
///
/// This client wraps `reqwest` and adds:
/// - Bearer injection for authorized calls, reading the device token store
/// - Single-flight token refresh shared by all concurrent 401s
/// - Exactly one resubmission per request after a successful refresh
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct FoodshareClient {
    inner: Client,
    config: Arc<ClientConfig>,
    tokens: TokenStore,
    events: AuthEventBus,
    coordinator: RefreshCoordinator,
}

impl FoodshareClient {
    /// Create a client from environment configuration with the on-device
    /// token store
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config, TokenStore::on_device())
    }

    /// Create a client with specific configuration and token store
    pub fn with_config(config: ClientConfig, tokens: TokenStore) -> ApiResult<Self> {
        Self::with_parts(config, tokens, AuthEventBus::new())
    }

    /// Create a client wired to an existing event bus
    ///
    /// Use this when the host shell already subscribes to session events
    /// (for example through an `AuthRedirector`).
    pub fn with_parts(
        config: ClientConfig,
        tokens: TokenStore,
        events: AuthEventBus,
    ) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static("foodshare-client-core/1.0"),
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let transport = RefreshEndpoint::new(&config)?;
        let coordinator = RefreshCoordinator::with_timeout(
            tokens.clone(),
            events.clone(),
            Arc::new(transport),
            config.refresh_timeout,
        );

        Ok(Self {
            inner,
            config: Arc::new(config),
            tokens,
            events,
            coordinator,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// The device token store this client reads and the coordinator writes
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// The bus session events are emitted on
    #[must_use]
    pub fn events(&self) -> &AuthEventBus {
        &self.events
    }

    pub(crate) fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Access session lifecycle endpoints
    #[must_use]
    pub fn session(&self) -> SessionApi {
        SessionApi::new(self.clone())
    }

    /// Access health check endpoints
    #[must_use]
    pub fn health(&self) -> HealthApi {
        HealthApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Low-level HTTP methods with session handling
    // -------------------------------------------------------------------------

    /// Perform a GET request
    #[instrument(skip(self), fields(request_id))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str, policy: RequestPolicy) -> ApiResult<T> {
        self.request(Method::GET, path, Option::<&()>::None, policy)
            .await
    }

    /// Perform a POST request with a JSON body
    #[instrument(skip(self, body), fields(request_id))]
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        policy: RequestPolicy,
    ) -> ApiResult<T> {
        self.request(Method::POST, path, Some(body), policy).await
    }

    /// Perform a POST request without a body
    #[instrument(skip(self), fields(request_id))]
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        policy: RequestPolicy,
    ) -> ApiResult<T> {
        self.request(Method::POST, path, Option::<&()>::None, policy)
            .await
    }

    /// Perform a DELETE request
    #[instrument(skip(self), fields(request_id))]
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        policy: RequestPolicy,
    ) -> ApiResult<T> {
        self.request(Method::DELETE, path, Option::<&()>::None, policy)
            .await
    }

    /// Execute a request through the session pipeline
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        policy: RequestPolicy,
    ) -> ApiResult<T> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let response = self.send_with_refresh(method, &url, body, policy).await?;
        self.handle_response(response).await
    }

    /// Send a request, refreshing the session and resubmitting once on a 401
    async fn send_with_refresh<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        policy: RequestPolicy,
    ) -> ApiResult<Response> {
        let mut attempt = Attempt::first();

        loop {
            let request_id = Uuid::new_v4().to_string();
            let response = self
                .send_once(&request_id, method.clone(), url, body, policy, &attempt)
                .await?;

            if response.status().as_u16() != 401 {
                return Ok(response);
            }

            if !policy.requires_auth {
                // An anonymous call was rejected; that is not a session
                // problem a refresh can repair.
                warn!(request_id = %request_id, url = %url, "public endpoint returned 401");
                self.events.emit(&AuthEvent::Unauthorized {
                    reason: Some(format!("{method} {url}")),
                });
                return Ok(response);
            }

            if attempt.is_retry() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                debug!(request_id = %request_id, url = %url, "still unauthorized after refresh");
                return Err(ApiError::retry_exhausted(message));
            }

            debug!(request_id = %request_id, url = %url, "received 401, refreshing session");
            let token = self.coordinator.begin_or_join().await?;
            attempt = attempt.retry_with(token);
        }
    }

    /// Send a single attempt
    async fn send_once<B: Serialize>(
        &self,
        request_id: &str,
        method: Method,
        url: &str,
        body: Option<&B>,
        policy: RequestPolicy,
        attempt: &Attempt,
    ) -> ApiResult<Response> {
        let mut request = self
            .inner
            .request(method, url)
            .header(X_REQUEST_ID, request_id);

        if policy.requires_auth {
            if let Some(token) = self.bearer_for(attempt).await {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        if let Some(b) = body {
            request = request.json(b);
        }

        debug!(request_id = %request_id, attempt = attempt.ordinal, "sending request");
        Ok(request.send().await?)
    }

    /// Token for this attempt: the refreshed one on a resubmission, otherwise
    /// whatever the store currently holds
    async fn bearer_for(&self, attempt: &Attempt) -> Option<String> {
        match &attempt.refreshed_token {
            Some(token) => Some(token.clone()),
            None => self.tokens.access_token().await,
        }
    }

    /// Handle HTTP response and deserialize
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(ApiError::Request)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ApiError::api_response(status.as_u16(), message))
        }
    }
}
