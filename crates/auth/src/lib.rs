//! Session and authentication core for Foodshare mobile clients
//!
//! This crate owns everything about a device session that does not touch the
//! HTTP stack:
//!
//! - **Token store**: the persisted access/refresh credential pair over an
//!   abstract device key-value store, with fail-safe reads
//! - **Event bus**: synchronous fan-out of session-level events (logout,
//!   refresh failure, unauthorized) to UI-side subscribers
//! - **Refresh coordinator**: single-flight token refresh, where concurrent
//!   401s share one refresh round trip and one outcome
//! - **Redirector**: the default "send the user to the login screen" binding
//!   between the bus and the host shell's navigation
//!
//! The HTTP half (request pipeline, refresh endpoint binding) lives in
//! `foodshare-api-client` and plugs in through the [`RefreshTransport`] trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use foodshare_auth::{AuthEventBus, AuthEventKind, TokenStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tokens = TokenStore::in_memory();
//!     tokens.set_tokens("access", "refresh").await;
//!
//!     let bus = AuthEventBus::new();
//!     let _sub = bus.subscribe(AuthEventKind::Logout, |event| {
//!         println!("session ended: {event:?}");
//!     });
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coordinator;
pub mod error;
pub mod events;
pub mod redirect;
pub mod store;

pub use coordinator::{RefreshCoordinator, RefreshTransport, RefreshedTokens};
pub use error::{AuthError, AuthResult, StoreError};
pub use events::{AuthEvent, AuthEventBus, AuthEventKind, Subscription};
pub use redirect::{AuthRedirector, Navigator, RedirectConfig};
pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, TokenStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::coordinator::{RefreshCoordinator, RefreshTransport, RefreshedTokens};
    pub use crate::error::{AuthError, AuthResult};
    pub use crate::events::{AuthEvent, AuthEventBus, AuthEventKind};
    pub use crate::redirect::{AuthRedirector, Navigator, RedirectConfig};
    pub use crate::store::TokenStore;
}
