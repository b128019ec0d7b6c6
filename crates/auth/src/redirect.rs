//! Login redirect binding for auth events
//!
//! Connects the event bus to the host shell's navigation: when the session
//! ends, send the user to the login route unless they are already on an auth
//! screen or the host opted out of automatic redirects.

use crate::events::{AuthEvent, AuthEventBus, AuthEventKind, Subscription};
use std::sync::Arc;
use tracing::debug;

/// Host-side navigation facade
pub trait Navigator: Send + Sync {
    /// Route currently shown
    fn current_route(&self) -> String;

    /// Navigate to a route
    fn navigate_to(&self, route: &str);
}

/// Callback run before the default redirect for one event kind
pub type EventOverride = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// Redirect behavior configuration
#[derive(Clone)]
pub struct RedirectConfig {
    /// Whether the default redirect runs at all
    pub auto_redirect: bool,
    /// Route to send the user to
    pub redirect_to: String,
    /// Routes on which the redirect is suppressed
    pub auth_routes: Vec<String>,
    /// Override for logout events
    pub on_logout: Option<EventOverride>,
    /// Override for refresh-failure events
    pub on_token_refresh_failed: Option<EventOverride>,
    /// Override for unauthorized events
    pub on_unauthorized: Option<EventOverride>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            auto_redirect: true,
            redirect_to: "/login".to_string(),
            auth_routes: vec![
                "/login".to_string(),
                "/register".to_string(),
                "/forgot-password".to_string(),
            ],
            on_logout: None,
            on_token_refresh_failed: None,
            on_unauthorized: None,
        }
    }
}

impl RedirectConfig {
    /// Builder-style method to toggle the automatic redirect
    #[must_use]
    pub fn with_auto_redirect(mut self, auto_redirect: bool) -> Self {
        self.auto_redirect = auto_redirect;
        self
    }

    /// Builder-style method to set the redirect target
    #[must_use]
    pub fn with_redirect_to(mut self, route: impl Into<String>) -> Self {
        self.redirect_to = route.into();
        self
    }

    /// Builder-style method to replace the suppression list
    #[must_use]
    pub fn with_auth_routes(mut self, routes: Vec<String>) -> Self {
        self.auth_routes = routes;
        self
    }

    /// Register an override for logout events
    #[must_use]
    pub fn on_logout<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.on_logout = Some(Arc::new(hook));
        self
    }

    /// Register an override for refresh-failure events
    #[must_use]
    pub fn on_token_refresh_failed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.on_token_refresh_failed = Some(Arc::new(hook));
        self
    }

    /// Register an override for unauthorized events
    #[must_use]
    pub fn on_unauthorized<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }
}

/// Active binding between the bus and a navigator
///
/// Holds its subscriptions; dropping the binding (or calling
/// [`AuthRedirector::detach`]) detaches all three handlers.
pub struct AuthRedirector {
    subscriptions: Vec<Subscription>,
}

impl AuthRedirector {
    /// Subscribe the redirect behavior to all session-ending events
    pub fn attach(
        bus: &AuthEventBus,
        navigator: Arc<dyn Navigator>,
        config: RedirectConfig,
    ) -> Self {
        let config = Arc::new(config);
        let subscriptions = [
            AuthEventKind::Logout,
            AuthEventKind::TokenRefreshFailed,
            AuthEventKind::Unauthorized,
        ]
        .into_iter()
        .map(|kind| {
            let navigator = Arc::clone(&navigator);
            let config = Arc::clone(&config);
            bus.subscribe(kind, move |event| {
                handle_event(event, navigator.as_ref(), &config);
            })
        })
        .collect();

        Self { subscriptions }
    }

    /// Detach all handlers
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

fn handle_event(event: &AuthEvent, navigator: &dyn Navigator, config: &RedirectConfig) {
    let override_hook = match event {
        AuthEvent::Logout { .. } => config.on_logout.as_ref(),
        AuthEvent::TokenRefreshFailed { .. } => config.on_token_refresh_failed.as_ref(),
        AuthEvent::Unauthorized { .. } => config.on_unauthorized.as_ref(),
    };
    if let Some(hook) = override_hook {
        hook(event);
    }

    if !config.auto_redirect {
        return;
    }

    let current = navigator.current_route();
    if config.auth_routes.iter().any(|route| route == &current) {
        debug!(route = %current, "already on an auth route, skipping redirect");
        return;
    }

    debug!(from = %current, to = %config.redirect_to, "redirecting after auth event");
    navigator.navigate_to(&config.redirect_to);
}
