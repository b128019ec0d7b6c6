//! CLI command implementations

pub mod health;
pub mod refresh;
pub mod sign_in;
pub mod sign_out;
pub mod status;
