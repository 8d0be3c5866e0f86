//! Once-per-mount check of a token left behind by an earlier session.
//!
//! A stored token is kept only if a `FreshnessCheck` confirms it. A negative
//! answer or any failure of the check clears the token (fail closed). The
//! clear is a compare-and-clear against the token seen when the check
//! started, so a login that completes while the check is in flight keeps its
//! new token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::TokenStore;

/// Asynchronous verdict on whether a token is still usable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FreshnessCheck: Send + Sync {
    async fn is_fresh(&self, token: &str) -> anyhow::Result<bool>;
}

/// Local check: a token is stale once it has been stored longer than
/// `max_age`.
pub struct ExpiryFreshnessCheck {
    store: Arc<dyn TokenStore>,
    max_age: Duration,
}

impl ExpiryFreshnessCheck {
    pub fn new(store: Arc<dyn TokenStore>, max_age: Duration) -> Self {
        Self { store, max_age }
    }
}

#[async_trait]
impl FreshnessCheck for ExpiryFreshnessCheck {
    async fn is_fresh(&self, token: &str) -> anyhow::Result<bool> {
        let fresh = match self.store.get()? {
            Some(stored) if stored.token == token => !stored.is_older_than(self.max_age),
            _ => false,
        };
        Ok(fresh)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Nothing stored, no check made
    NoToken,
    /// Check confirmed the token
    Kept,
    /// Token was stale or unverifiable and has been removed
    Cleared { reason: String },
    /// Token was stale but a newer one replaced it during the check
    Superseded,
    /// Token was stale but removing it failed
    ClearFailed { reason: String },
}

pub struct SessionBootstrapper {
    store: Arc<dyn TokenStore>,
    check: Arc<dyn FreshnessCheck>,
}

impl SessionBootstrapper {
    pub fn new(store: Arc<dyn TokenStore>, check: Arc<dyn FreshnessCheck>) -> Self {
        Self { store, check }
    }

    /// Run the check to completion. Never fails; every problem ends up in
    /// the outcome and the log.
    pub async fn run(&self) -> BootstrapOutcome {
        let observed = match self.store.get() {
            Ok(Some(stored)) => stored.token,
            Ok(None) => {
                debug!("No stored token");
                return BootstrapOutcome::NoToken;
            }
            Err(e) => {
                // Nothing to compare against, so this is the one blind clear
                warn!(error = %e, "Stored token unreadable, clearing");
                let reason = format!("stored token unreadable: {}", e);
                return match self.store.clear() {
                    Ok(()) => BootstrapOutcome::Cleared { reason },
                    Err(e) => {
                        error!(error = %e, "Failed to clear unreadable token");
                        BootstrapOutcome::ClearFailed { reason }
                    }
                };
            }
        };

        let reason = match self.check.is_fresh(&observed).await {
            Ok(true) => {
                debug!("Stored token is fresh");
                return BootstrapOutcome::Kept;
            }
            Ok(false) => "token reported stale".to_string(),
            Err(e) => format!("freshness check failed: {:#}", e),
        };
        warn!(%reason, "Discarding stored token");

        match self.store.clear_if(&observed) {
            Ok(true) => BootstrapOutcome::Cleared { reason },
            Ok(false) => {
                info!("Token replaced during freshness check, keeping the newer one");
                BootstrapOutcome::Superseded
            }
            Err(e) => {
                error!(error = %e, "Failed to clear stale token");
                BootstrapOutcome::ClearFailed { reason }
            }
        }
    }

    /// Start the check in the background and return at once.
    pub fn spawn(self) -> BootstrapHandle {
        BootstrapHandle {
            task: tokio::spawn(async move { self.run().await }),
        }
    }
}

/// Handle to a running bootstrap check. Dropping it cancels the check.
pub struct BootstrapHandle {
    task: JoinHandle<BootstrapOutcome>,
}

impl BootstrapHandle {
    /// Abort the check. A check cancelled before it resolves never touches
    /// the store.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the outcome; `None` if the check was cancelled or panicked.
    pub async fn outcome(mut self) -> Option<BootstrapOutcome> {
        match (&mut self.task).await {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                error!(error = %e, "Bootstrap check panicked");
                None
            }
        }
    }
}

impl Drop for BootstrapHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTokenStore, Retention, StoredToken};
    use chrono::Utc;

    fn seeded(token: &str) -> Arc<MemoryTokenStore> {
        Arc::new(MemoryTokenStore::with_token(StoredToken::new(token, Retention::Persistent)))
    }

    fn current(store: &MemoryTokenStore) -> Option<String> {
        store.get().unwrap().map(|s| s.token)
    }

    #[tokio::test]
    async fn test_no_token_skips_check() {
        let mut check = MockFreshnessCheck::new();
        check.expect_is_fresh().never();

        let store = Arc::new(MemoryTokenStore::new());
        let outcome = SessionBootstrapper::new(store, Arc::new(check)).run().await;
        assert_eq!(outcome, BootstrapOutcome::NoToken);
    }

    #[tokio::test]
    async fn test_fresh_token_is_kept() {
        let mut check = MockFreshnessCheck::new();
        check
            .expect_is_fresh()
            .withf(|token| token == "T1")
            .times(1)
            .returning(|_| Ok(true));

        let store = seeded("T1");
        let outcome = SessionBootstrapper::new(store.clone(), Arc::new(check)).run().await;
        assert_eq!(outcome, BootstrapOutcome::Kept);
        assert_eq!(current(&store).as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_stale_token_is_cleared() {
        let mut check = MockFreshnessCheck::new();
        check.expect_is_fresh().returning(|_| Ok(false));

        let store = seeded("T1");
        let outcome = SessionBootstrapper::new(store.clone(), Arc::new(check)).run().await;
        assert!(matches!(outcome, BootstrapOutcome::Cleared { .. }));
        assert_eq!(current(&store), None);
    }

    #[tokio::test]
    async fn test_failing_check_clears_token() {
        let mut check = MockFreshnessCheck::new();
        check
            .expect_is_fresh()
            .returning(|_| Err(anyhow::anyhow!("verify endpoint unreachable")));

        let store = seeded("T1");
        let outcome = SessionBootstrapper::new(store.clone(), Arc::new(check)).run().await;
        match outcome {
            BootstrapOutcome::Cleared { reason } => assert!(reason.contains("unreachable")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(current(&store), None);
    }

    /// Check that lets a login replace the token before reporting failure.
    struct RacingCheck {
        store: Arc<MemoryTokenStore>,
    }

    #[async_trait]
    impl FreshnessCheck for RacingCheck {
        async fn is_fresh(&self, _token: &str) -> anyhow::Result<bool> {
            self.store.set("T2", Retention::Persistent)?;
            Err(anyhow::anyhow!("timed out"))
        }
    }

    #[tokio::test]
    async fn test_late_failure_does_not_clobber_new_login() {
        let store = seeded("T1");
        let check = RacingCheck { store: store.clone() };

        let outcome = SessionBootstrapper::new(store.clone(), Arc::new(check)).run().await;
        assert_eq!(outcome, BootstrapOutcome::Superseded);
        assert_eq!(current(&store).as_deref(), Some("T2"));
    }

    struct PendingCheck;

    #[async_trait]
    impl FreshnessCheck for PendingCheck {
        async fn is_fresh(&self, _token: &str) -> anyhow::Result<bool> {
            std::future::pending::<anyhow::Result<bool>>().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_check_leaves_store_untouched() {
        let store = seeded("T1");
        let handle = SessionBootstrapper::new(store.clone(), Arc::new(PendingCheck)).spawn();
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        handle.cancel();
        assert_eq!(handle.outcome().await, None);
        assert_eq!(current(&store).as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_spawned_check_reports_outcome() {
        let mut check = MockFreshnessCheck::new();
        check.expect_is_fresh().returning(|_| Ok(false));

        let store = seeded("T1");
        let handle = SessionBootstrapper::new(store.clone(), Arc::new(check)).spawn();
        assert!(matches!(handle.outcome().await, Some(BootstrapOutcome::Cleared { .. })));
        assert_eq!(current(&store), None);
    }

    #[tokio::test]
    async fn test_unreadable_token_is_cleared() {
        let mut store = crate::store::MockTokenStore::new();
        store
            .expect_get()
            .returning(|| Err(crate::error::StorageError::Poisoned));
        store.expect_clear().times(1).returning(|| Ok(()));
        let mut check = MockFreshnessCheck::new();
        check.expect_is_fresh().never();

        let outcome = SessionBootstrapper::new(Arc::new(store), Arc::new(check)).run().await;
        assert!(matches!(outcome, BootstrapOutcome::Cleared { .. }));
    }

    #[tokio::test]
    async fn test_expiry_check() {
        let mut old = StoredToken::new("OLD", Retention::Persistent);
        old.stored_at = Utc::now() - Duration::minutes(31);
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_token(old));
        let check = ExpiryFreshnessCheck::new(store.clone(), Duration::minutes(30));
        assert!(!check.is_fresh("OLD").await.unwrap());

        store.set("NEW", Retention::Ephemeral).unwrap();
        assert!(check.is_fresh("NEW").await.unwrap());
        // A token that is no longer current is never fresh
        assert!(!check.is_fresh("OLD").await.unwrap());
    }
}
