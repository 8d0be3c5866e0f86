//! Exchange validated credentials for a session token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::api::{ApiError, LoginRequest, UserRecord};
use crate::auth::Credentials;
use crate::error::AuthError;
use crate::store::{Retention, TokenStore};

/// Remote login call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<Vec<UserRecord>, ApiError>;
}

/// Moves the user to the authenticated landing view.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn go_to_landing(&self);
}

/// Sink for human-readable failure descriptions.
#[cfg_attr(test, mockall::automock)]
pub trait Diagnostics: Send + Sync {
    fn report(&self, message: &str);
}

/// Reports failures through the `tracing` error log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, message: &str) {
        error!(target: "sessionkit::diagnostics", "{}", message);
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Token stored and navigation done
    SignedIn,
    /// Attempt failed; nothing was stored
    Rejected(AuthError),
    /// Another submission is still in flight
    AlreadyPending,
}

/// Clears the pending flag however the submission ends, including when the
/// future is dropped mid-flight.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs login attempts for one form. Clones share the pending flag, so only
/// one attempt is in flight across all of them.
#[derive(Clone)]
pub struct LoginSubmitter {
    service: Arc<dyn LoginService>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    diagnostics: Arc<dyn Diagnostics>,
    pending: Arc<AtomicBool>,
}

impl LoginSubmitter {
    pub fn new(
        service: Arc<dyn LoginService>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            service,
            store,
            navigator,
            diagnostics: Arc::new(TracingDiagnostics),
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub async fn submit(&self, credentials: &Credentials) -> SubmitOutcome {
        let Some(_guard) = PendingGuard::acquire(&self.pending) else {
            debug!("Submission already in flight, ignoring");
            return SubmitOutcome::AlreadyPending;
        };

        match self.authenticate(credentials).await {
            Ok(()) => SubmitOutcome::SignedIn,
            Err(e) => {
                self.diagnostics.report(&format!("Login failed for {}: {}", credentials.email, e));
                SubmitOutcome::Rejected(e)
            }
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let users = self.service.login(&LoginRequest::from(credentials)).await?;
        let token = first_token(&users)?;

        let retention = Retention::from_remember(credentials.remember);
        self.store.set(token, retention)?;
        info!(?retention, "Login successful, session token stored");

        self.navigator.go_to_landing();
        Ok(())
    }
}

fn first_token(users: &[UserRecord]) -> Result<&str, AuthError> {
    let first = users.first().ok_or(AuthError::EmptyResponse)?;
    first
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}
