//! Login form state.
//!
//! `LoginForm` owns the raw input and per-field errors and drives one
//! `LoginSubmitter`. Validation is silent until the first submission
//! attempt; after that every field change re-validates. Mounting starts the
//! session bootstrap check; unmounting (or dropping the form) cancels it.

use tracing::debug;

use crate::auth::{
    validate, BootstrapHandle, BootstrapOutcome, CredentialInput, LoginSubmitter,
    SessionBootstrapper, SubmitOutcome, ValidationErrors,
};

#[derive(Debug)]
pub enum FormSubmission {
    /// Input failed validation, nothing was sent
    Blocked,
    Submitted(SubmitOutcome),
}

pub struct LoginForm {
    input: CredentialInput,
    submitted_once: bool,
    errors: ValidationErrors,
    last_error: Option<String>,
    submitter: LoginSubmitter,
    bootstrap: Option<BootstrapHandle>,
    mounted: bool,
}

impl LoginForm {
    pub fn new(submitter: LoginSubmitter) -> Self {
        Self {
            input: CredentialInput::default(),
            submitted_once: false,
            errors: ValidationErrors::default(),
            last_error: None,
            submitter,
            bootstrap: None,
            mounted: false,
        }
    }

    /// Lifecycle hook: start the bootstrap check. Only the first call per
    /// mount does anything; returns whether the check was started.
    pub fn mount(&mut self, bootstrapper: SessionBootstrapper) -> bool {
        if self.mounted {
            debug!("Login form already mounted");
            return false;
        }
        self.mounted = true;
        self.bootstrap = Some(bootstrapper.spawn());
        true
    }

    pub fn unmount(&mut self) {
        if let Some(handle) = self.bootstrap.take() {
            if !handle.is_finished() {
                debug!("Cancelling pending bootstrap check");
            }
            handle.cancel();
        }
        self.mounted = false;
    }

    /// Wait for the bootstrap check started by `mount`, if still held.
    pub async fn wait_for_bootstrap(&mut self) -> Option<BootstrapOutcome> {
        match self.bootstrap.take() {
            Some(handle) => handle.outcome().await,
            None => None,
        }
    }

    pub fn email(&self) -> &str {
        &self.input.email
    }

    pub fn remember(&self) -> bool {
        self.input.remember.unwrap_or(false)
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.input.email = email.into();
        self.revalidate();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.input.password = password.into();
        self.revalidate();
    }

    pub fn set_remember(&mut self, remember: bool) {
        self.input.remember = Some(remember);
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Message from the last failed sign-in, cleared by the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// False while a submission is in flight; frontends disable the
    /// submit action on it.
    pub fn can_submit(&self) -> bool {
        !self.submitter.is_pending()
    }

    fn revalidate(&mut self) {
        if self.submitted_once {
            self.errors = validate(&self.input).err().unwrap_or_default();
        }
    }

    pub async fn submit(&mut self) -> FormSubmission {
        self.submitted_once = true;
        let credentials = match validate(&self.input) {
            Ok(credentials) => credentials,
            Err(errors) => {
                debug!(%errors, "Submission blocked by validation");
                self.errors = errors;
                return FormSubmission::Blocked;
            }
        };
        self.errors = ValidationErrors::default();
        self.last_error = None;

        let outcome = self.submitter.submit(&credentials).await;
        match outcome {
            SubmitOutcome::SignedIn => self.input.password.clear(),
            SubmitOutcome::Rejected(ref e) => self.last_error = Some(e.user_message()),
            SubmitOutcome::AlreadyPending => {}
        }
        FormSubmission::Submitted(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::api::{ApiError, UserRecord};
    use crate::auth::bootstrap::MockFreshnessCheck;
    use crate::auth::submitter::{MockLoginService, MockNavigator};
    use crate::auth::{ErrorCode, Field};
    use crate::store::{MemoryTokenStore, Retention, StoredToken, TokenStore};

    fn form_with(
        service: MockLoginService,
        navigator: MockNavigator,
        store: Arc<MemoryTokenStore>,
    ) -> LoginForm {
        LoginForm::new(LoginSubmitter::new(Arc::new(service), store, Arc::new(navigator)))
    }

    fn idle_form() -> LoginForm {
        form_with(unreachable_service(), idle_navigator(), Arc::new(MemoryTokenStore::new()))
    }

    fn unreachable_service() -> MockLoginService {
        let mut service = MockLoginService::new();
        service.expect_login().never();
        service
    }

    fn idle_navigator() -> MockNavigator {
        let mut navigator = MockNavigator::new();
        navigator.expect_go_to_landing().never();
        navigator
    }

    #[tokio::test]
    async fn test_sign_in_scenario() {
        let mut service = MockLoginService::new();
        service.expect_login().times(1).returning(|_| {
            Ok(vec![UserRecord {
                token: Some("T1".to_string()),
                ..Default::default()
            }])
        });
        let mut navigator = MockNavigator::new();
        navigator.expect_go_to_landing().times(1).return_const(());
        let store = Arc::new(MemoryTokenStore::new());

        let mut form = form_with(service, navigator, store.clone());
        form.set_email("a@b.com");
        form.set_password("x");
        assert!(!form.remember());
        form.set_remember(true);
        assert!(form.remember());

        let result = form.submit().await;
        assert!(matches!(result, FormSubmission::Submitted(SubmitOutcome::SignedIn)));
        let stored = store.get().unwrap().unwrap();
        assert_eq!(stored.token, "T1");
        assert_eq!(stored.retention, Retention::Persistent);
        assert!(form.input.password.is_empty());
        assert_eq!(form.email(), "a@b.com");
    }

    #[tokio::test]
    async fn test_bad_email_blocks_submission() {
        let mut form = idle_form();
        form.set_email("bad");
        form.set_password("x");

        assert!(matches!(form.submit().await, FormSubmission::Blocked));
        assert_eq!(form.errors().get(Field::Email), Some(ErrorCode::EmailInvalid));
    }

    #[tokio::test]
    async fn test_empty_password_blocks_submission() {
        let mut form = idle_form();
        form.set_email("a@b.com");

        assert!(matches!(form.submit().await, FormSubmission::Blocked));
        assert_eq!(form.errors().get(Field::Password), Some(ErrorCode::PasswordRequired));
    }

    #[tokio::test]
    async fn test_revalidates_on_change_only_after_first_submit() {
        let mut form = idle_form();
        form.set_email("bad");
        assert!(form.errors().is_empty());

        form.submit().await;
        assert_eq!(form.errors().get(Field::Email), Some(ErrorCode::EmailInvalid));
        assert_eq!(form.errors().get(Field::Password), Some(ErrorCode::PasswordRequired));

        form.set_email("a@b.com");
        assert_eq!(form.errors().get(Field::Email), None);
        assert_eq!(form.errors().get(Field::Password), Some(ErrorCode::PasswordRequired));

        form.set_password("x");
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_form_usable() {
        let mut service = MockLoginService::new();
        service
            .expect_login()
            .times(2)
            .returning(|_| Err(ApiError::Unauthorized));
        let store = Arc::new(MemoryTokenStore::new());
        let mut form = form_with(service, idle_navigator(), store.clone());
        form.set_email("a@b.com");
        form.set_password("wrong");

        let result = form.submit().await;
        assert!(matches!(result, FormSubmission::Submitted(SubmitOutcome::Rejected(_))));
        assert_eq!(form.last_error(), Some("Invalid email or password"));
        assert_eq!(form.input.password, "wrong");
        assert!(form.can_submit());
        assert!(store.get().unwrap().is_none());

        // Retry is allowed
        assert!(matches!(
            form.submit().await,
            FormSubmission::Submitted(SubmitOutcome::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_mount_runs_bootstrap_once() {
        let mut check = MockFreshnessCheck::new();
        check.expect_is_fresh().times(1).returning(|_| Ok(false));
        let check = Arc::new(check);
        let store = Arc::new(MemoryTokenStore::with_token(StoredToken::new(
            "OLD",
            Retention::Persistent,
        )));
        let mut form = form_with(unreachable_service(), idle_navigator(), store.clone());

        assert!(form.mount(SessionBootstrapper::new(store.clone(), check.clone())));
        assert!(!form.mount(SessionBootstrapper::new(store.clone(), check)));

        assert!(matches!(form.wait_for_bootstrap().await, Some(BootstrapOutcome::Cleared { .. })));
        assert!(store.get().unwrap().is_none());
    }
}
