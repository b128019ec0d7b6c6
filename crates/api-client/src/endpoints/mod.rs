//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for a set of backend routes.
//!
//! | Module | Backend routes | Description |
//! |--------|----------------|-------------|
//! | `session` | `auth/login`, `auth/logout`, `auth/refresh` | Session lifecycle |
//! | `health` | `health` | Public service health check |

pub mod health;
pub mod session;

pub use health::HealthApi;
pub use session::SessionApi;
