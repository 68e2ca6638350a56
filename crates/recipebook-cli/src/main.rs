//! recipebook - sign in to the recipe book from the terminal.
//!
//! Commands: `login`, `signup`, `logout`, `status`, `watch`.

mod form;

use std::env;
use std::io::{self, Write};

use anyhow::Result;
use recipebook_core::{AuthMode, Config, Session, SessionManager};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use form::AuthForm;

// ============================================================================
// Constants
// ============================================================================

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "warn";

/// Directory for a daily rolling log file, if set
const LOG_DIR_ENV: &str = "RECIPEBOOK_LOG_DIR";

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "recipebook.log";

/// Pre-filled form values
const EMAIL_ENV: &str = "RECIPEBOOK_EMAIL";
const PASSWORD_ENV: &str = "RECIPEBOOK_PASSWORD";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file when dropped.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn print_usage() {
    eprintln!("Usage: recipebook <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login    Sign in with email and password");
    eprintln!("  signup   Create an account");
    eprintln!("  logout   End the current session");
    eprintln!("  status   Show the current session (default)");
    eprintln!("  watch    Follow the session until it ends");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let command = env::args().nth(1).unwrap_or_else(|| "status".to_string());
    if matches!(command.as_str(), "help" | "-h" | "--help") {
        print_usage();
        return Ok(());
    }

    let mut config = Config::load()?;
    let manager = SessionManager::from_config(&config)?;
    manager.restore_session();

    match command.as_str() {
        "login" => run_form(&manager, &mut config, AuthMode::Login).await,
        "signup" => run_form(&manager, &mut config, AuthMode::SignUp).await,
        "logout" => {
            manager.logout();
            println!("Logged out.");
            Ok(())
        }
        "status" => {
            print_status(manager.current().as_ref());
            println!("Session data: {}", manager.store().data_dir().display());
            Ok(())
        }
        "watch" => watch(&manager).await,
        other => {
            print_usage();
            Err(anyhow::anyhow!("Unknown command: {}", other))
        }
    }
}

/// Fill the form from the environment or by prompting, then submit it
async fn run_form(manager: &SessionManager, config: &mut Config, mode: AuthMode) -> Result<()> {
    let mut form = AuthForm::new(mode);

    form.email = match env::var(EMAIL_ENV) {
        Ok(email) if !email.is_empty() => email,
        _ => prompt_email(config.last_email.as_deref())?,
    };
    form.password = match env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    println!("\n{}...", form.mode.label());

    match form.submit(manager).await {
        Some(result) => {
            config.last_email = Some(result.email.clone());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            info!(email = %result.email, "Signed in from terminal");
            print_status(manager.current().as_ref());
            Ok(())
        }
        None => {
            let message = form
                .error
                .take()
                .unwrap_or_else(|| "An error occurred!".to_string());
            Err(anyhow::anyhow!(message))
        }
    }
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last_email) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn print_status(session: Option<&Session>) {
    match session {
        Some(session) if session.is_valid() => {
            println!(
                "Signed in as {} (user {}), token valid for {} more minutes.",
                session.email,
                session.user_id,
                session.minutes_until_expiry()
            );
        }
        Some(session) => println!("Session for {} has expired.", session.email),
        None => println!("Not signed in."),
    }
}

/// Print session changes until the session ends or Ctrl-C
async fn watch(manager: &SessionManager) -> Result<()> {
    let mut rx = manager.subscribe();
    print_status(rx.borrow_and_update().as_ref());

    if rx.borrow().is_none() {
        return Ok(());
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let session = rx.borrow_and_update().clone();
                print_status(session.as_ref());
                if session.is_none() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }
        }
    }
}
