//! Login flow: validating input, checking a stored session, signing in.
//!
//! This module provides:
//! - `validate`: schema check of raw form input into `Credentials`
//! - `SessionBootstrapper`: once-per-mount freshness check of a stored token
//! - `LoginSubmitter`: remote login call and token commit

pub mod bootstrap;
pub mod credentials;
pub mod submitter;

pub use bootstrap::{
    BootstrapHandle, BootstrapOutcome, ExpiryFreshnessCheck, FreshnessCheck, SessionBootstrapper,
};
pub use credentials::{validate, CredentialInput, Credentials, ErrorCode, Field, ValidationErrors};
pub use submitter::{
    Diagnostics, LoginService, LoginSubmitter, Navigator, SubmitOutcome, TracingDiagnostics,
};
