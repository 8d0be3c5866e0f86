//! sessionkit - terminal sign-in for the session token store.
//!
//! Without arguments, shows the login form: checks any stored token in the
//! background, prompts for credentials, and stores the new token on success.
//! `--status` reports the stored token after checking it, `--logout` removes
//! it.

mod prompt;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessionkit_core::auth::{
    ExpiryFreshnessCheck, Field, FreshnessCheck, Navigator, SessionBootstrapper, SubmitOutcome,
};
use sessionkit_core::store::{open_token_store, TokenStore};
use sessionkit_core::{
    AuthClient, BootstrapOutcome, Config, FormSubmission, LoginForm, LoginSubmitter,
};

// ============================================================================
// Constants
// ============================================================================

/// Failed sign-in attempts allowed before giving up. Validation failures
/// do not count.
const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Prefills the email field
const ENV_EMAIL: &str = "SESSIONKIT_EMAIL";

/// Used for the first attempt instead of prompting
const ENV_PASSWORD: &str = "SESSIONKIT_PASSWORD";

const LOG_FILE_PREFIX: &str = "sessionkit.log";

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr and to a daily file in the data directory.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(filter)
        .init();

    guard
}

/// Landing view for the terminal: there is nothing to route to, so
/// arriving there means telling the user they are in.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn go_to_landing(&self) {
        println!("\nSigned in. Welcome!");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}, using default config", e);
        Config::default()
    });
    let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let _log_guard = init_tracing(&data_dir);
    info!(api_url = %config.api_url, backend = ?config.token_backend, "sessionkit starting");

    let store = open_token_store(&config, &data_dir);
    let client = AuthClient::from_config(&config).context("Failed to build HTTP client")?;
    let check: Arc<dyn FreshnessCheck> = match config.max_token_age() {
        Some(max_age) => Arc::new(ExpiryFreshnessCheck::new(store.clone(), max_age)),
        None => Arc::new(client.clone()),
    };

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--status") => status(store, check).await,
        Some("--logout") => logout(store.as_ref()),
        Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            Err(anyhow::anyhow!("Unknown argument: {}", other))
        }
        None => sign_in(config, store, check, client).await,
    }
}

fn print_usage() {
    println!("Usage: sessionkit [--status | --logout]");
    println!();
    println!("  (no args)   sign in and store a session token");
    println!("  --status    check the stored token and report it");
    println!("  --logout    remove the stored token");
}

async fn status(store: Arc<dyn TokenStore>, check: Arc<dyn FreshnessCheck>) -> Result<()> {
    let outcome = SessionBootstrapper::new(store.clone(), check).run().await;
    match outcome {
        BootstrapOutcome::NoToken => println!("Not signed in."),
        BootstrapOutcome::Kept => {
            if let Some(stored) = store.get()? {
                println!(
                    "Signed in ({:?}, stored {} minutes ago).",
                    stored.retention,
                    stored.age().num_minutes().max(0)
                );
            }
        }
        BootstrapOutcome::Cleared { reason } => {
            println!("Stored session was no longer valid and has been removed ({}).", reason)
        }
        BootstrapOutcome::Superseded => println!("Signed in (session replaced during check)."),
        BootstrapOutcome::ClearFailed { reason } => {
            println!("Stored session is invalid ({}) but could not be removed.", reason)
        }
    }
    Ok(())
}

fn logout(store: &dyn TokenStore) -> Result<()> {
    store.clear().context("Failed to remove stored token")?;
    info!("Stored token removed");
    println!("Signed out.");
    Ok(())
}

async fn sign_in(
    mut config: Config,
    store: Arc<dyn TokenStore>,
    check: Arc<dyn FreshnessCheck>,
    client: AuthClient,
) -> Result<()> {
    println!("\n=== Sign in ===\n");

    let submitter =
        LoginSubmitter::new(Arc::new(client), store.clone(), Arc::new(ConsoleNavigator));
    let mut form = LoginForm::new(submitter);
    form.mount(SessionBootstrapper::new(store, check));

    let default_email = std::env::var(ENV_EMAIL).ok().or_else(|| config.last_email.clone());
    form.set_email(prompt::prompt_email(default_email.as_deref())?);
    match std::env::var(ENV_PASSWORD) {
        Ok(password) => form.set_password(password),
        Err(_) => form.set_password(prompt::prompt_password()?),
    }
    form.set_remember(prompt::prompt_remember()?);

    let mut failures = 0;
    loop {
        println!("\nSigning in...");
        match form.submit().await {
            FormSubmission::Blocked => {
                for (field, code) in form.errors().iter() {
                    eprintln!("  {}: {}", field.name(), code.message());
                }
                if form.errors().get(Field::Email).is_some() {
                    form.set_email(prompt::prompt_email(None)?);
                }
                if form.errors().get(Field::Password).is_some() {
                    form.set_password(prompt::prompt_password()?);
                }
            }
            FormSubmission::Submitted(SubmitOutcome::SignedIn) => {
                if let Some(notice) = prompt::session_notice(form.remember()) {
                    println!("{}", notice);
                }
                config.last_email = Some(form.email().to_string());
                if let Err(e) = config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                return Ok(());
            }
            FormSubmission::Submitted(SubmitOutcome::Rejected(_)) => {
                failures += 1;
                eprintln!("{}", form.last_error().unwrap_or("Login failed"));
                if failures >= MAX_LOGIN_ATTEMPTS {
                    return Err(anyhow::anyhow!("Giving up after {} failed attempts", failures));
                }
                form.set_password(prompt::prompt_password()?);
            }
            FormSubmission::Submitted(SubmitOutcome::AlreadyPending) => {
                return Err(anyhow::anyhow!("Sign-in already in progress"));
            }
        }
    }
}
