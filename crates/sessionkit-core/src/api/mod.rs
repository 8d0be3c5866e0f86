//! REST client for the remote login service.
//!
//! This module provides the `AuthClient` used to exchange credentials for a
//! session token and to ask the service whether a stored token is still
//! accepted. Tokens are presented as bearer tokens.

pub mod client;
pub mod error;

pub use client::{AuthClient, LoginRequest, UserRecord};
pub use error::ApiError;
