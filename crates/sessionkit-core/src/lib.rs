//! Client-side sign-in core.
//!
//! Validates login input, checks a session token left by an earlier run,
//! exchanges credentials for a new token and keeps that token in the
//! retention class the user asked for.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod form;
pub mod store;

pub use api::{ApiError, AuthClient};
pub use auth::{
    BootstrapOutcome, CredentialInput, Credentials, LoginSubmitter, SessionBootstrapper,
    SubmitOutcome,
};
pub use config::Config;
pub use error::{AuthError, StorageError};
pub use form::{FormSubmission, LoginForm};
pub use store::{Retention, TokenStore};
