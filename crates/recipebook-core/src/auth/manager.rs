//! Session lifecycle management.
//!
//! `SessionManager` owns the single current-session slot. It signs users up
//! and in through the `IdentityClient`, publishes every session change on a
//! `watch` channel, mirrors the session to `SessionStore`, and keeps exactly
//! one expiration timer armed while a session is live.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::session::{Session, SessionRecord};
use super::storage::SessionStore;
use crate::api::{AuthError, AuthResult, IdentityClient};
use crate::config::Config;

/// Which identity endpoint a credential submission goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    SignUp,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::Login,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuthMode::Login => "Login",
            AuthMode::SignUp => "Sign Up",
        }
    }
}

/// The single pending expiration timer.
///
/// `generation` changes on every cancel, so a timer task that already woke
/// up can tell it has been superseded.
#[derive(Default)]
struct ExpirationTimer {
    generation: u64,
    handle: Option<AbortHandle>,
    armed_for: Option<Duration>,
}

impl ExpirationTimer {
    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.armed_for = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

struct Inner {
    client: IdentityClient,
    store: SessionStore,
    timer: Mutex<ExpirationTimer>,
    current: watch::Sender<Option<Session>>,
}

impl Inner {
    fn lock_timer(&self) -> MutexGuard<'_, ExpirationTimer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of the current session. Clone is cheap and shares state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(client: IdentityClient, store: SessionStore) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                timer: Mutex::new(ExpirationTimer::default()),
                current,
            }),
        }
    }

    /// Build a manager from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = IdentityClient::with_base_url(config.api_key()?, config.identity_base_url())?;
        let store = SessionStore::new(config.data_dir()?);
        debug!(
            base_url = client.base_url(),
            data_dir = ?store.data_dir(),
            "Session manager configured"
        );
        Ok(Self::new(client, store))
    }

    /// Receive session changes. The receiver starts with the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Option<Session> {
        self.inner.current.borrow().clone()
    }

    /// Check if there is a session with a valid token
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .current
            .borrow()
            .as_ref()
            .is_some_and(Session::is_valid)
    }

    /// Duration the pending expiration timer was armed for, if any
    pub fn pending_expiration(&self) -> Option<Duration> {
        self.inner.lock_timer().armed_for
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Register a new account and start a session for it
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        self.authenticate(AuthMode::SignUp, email, password).await
    }

    /// Sign in and start a session
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        self.authenticate(AuthMode::Login, email, password).await
    }

    /// Send one credential request; commit a session on success.
    ///
    /// A failure leaves the current session and timer untouched.
    pub async fn authenticate(
        &self,
        mode: AuthMode,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, AuthError> {
        info!(?mode, email, "Authenticating");

        let response = match mode {
            AuthMode::Login => self.inner.client.sign_in_with_password(email, password).await,
            AuthMode::SignUp => self.inner.client.sign_up(email, password).await,
        };

        let committed = response.and_then(|result| {
            let session = self.commit_session(&result)?;
            Ok((result, session))
        });

        match committed {
            Ok((result, session)) => {
                info!(
                    email = %session.email,
                    user_id = %session.user_id,
                    expires_at = %session.token_expiry,
                    "Authentication successful"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(?mode, error = ?e, "Authentication failed");
                Err(e)
            }
        }
    }

    /// End the session: publish `None`, drop the stored record, cancel the timer.
    pub fn logout(&self) {
        let mut timer = self.inner.lock_timer();
        self.clear_session(&mut timer);
        info!("Logged out");
    }

    /// Bring back a stored session at startup.
    ///
    /// Records with an empty token are ignored. Records whose token has
    /// already expired are removed instead of being published.
    /// Must be called from within a Tokio runtime.
    pub fn restore_session(&self) -> Option<Session> {
        let record = match self.inner.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No stored session");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored session");
                return None;
            }
        };

        let session = Session::from(record);
        if session.token.is_empty() {
            debug!("Stored session has no token");
            return None;
        }

        let remaining = match session.time_until_expiry().to_std() {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => {
                info!(
                    email = %session.email,
                    expired_at = %session.token_expiry,
                    "Stored session already expired"
                );
                if let Err(e) = self.inner.store.clear() {
                    warn!(error = %e, "Failed to remove expired session");
                }
                return None;
            }
        };

        let mut timer = self.inner.lock_timer();
        self.inner.current.send_replace(Some(session.clone()));
        self.schedule_expiration(&mut timer, remaining);

        info!(
            email = %session.email,
            minutes_left = session.minutes_until_expiry(),
            "Session restored"
        );
        Some(session)
    }

    /// Publish, persist and arm expiry for a fresh authentication result.
    ///
    /// An unrepresentable expiry is rejected before anything is published.
    fn commit_session(&self, result: &AuthResult) -> Result<Session, AuthError> {
        let session = Session::from_auth_result(result, Utc::now()).ok_or_else(|| {
            AuthError::Unknown(format!(
                "token lifetime out of range: {}s",
                result.expires_in_secs
            ))
        })?;
        let lifetime = Duration::from_secs(u64::try_from(result.expires_in_secs).unwrap_or(0));

        let mut timer = self.inner.lock_timer();
        self.inner.current.send_replace(Some(session.clone()));

        if let Err(e) = self.inner.store.save(&SessionRecord::from(&session)) {
            warn!(error = %e, "Failed to save session");
        }

        self.schedule_expiration(&mut timer, lifetime);
        Ok(session)
    }

    /// Cancel any pending timer, then arm one that logs out after `duration`.
    fn schedule_expiration(&self, timer: &mut ExpirationTimer, duration: Duration) {
        timer.cancel();

        let generation = timer.generation;
        let inner = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = inner.upgrade() {
                SessionManager { inner }.expire(generation);
            }
        });

        timer.handle = Some(task.abort_handle());
        timer.armed_for = Some(duration);
        debug!(secs = duration.as_secs(), generation, "Expiration timer armed");
    }

    fn expire(&self, generation: u64) {
        let mut timer = self.inner.lock_timer();
        if timer.generation != generation {
            debug!(generation, "Superseded expiration timer ignored");
            return;
        }

        // Running task; nothing to abort.
        timer.handle = None;
        info!("Session token expired, logging out");
        self.clear_session(&mut timer);
    }

    fn clear_session(&self, timer: &mut ExpirationTimer) {
        timer.cancel();
        self.inner.current.send_replace(None);

        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to remove stored session");
        }
    }
}
