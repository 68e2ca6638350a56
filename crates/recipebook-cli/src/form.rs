//! Login/sign-up form state.
//!
//! Holds what the user typed, which mode the form is in, whether a request
//! is in flight, and the last error message to show.

use recipebook_core::{AuthMode, AuthResult, SessionManager};
use tracing::{debug, error, info};

/// Minimum password length the identity provider accepts
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length for email input.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_login_mode(&self) -> bool {
        self.mode == AuthMode::Login
    }

    /// Switch between login and sign-up
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Check the entered credentials before anything is sent
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.len() > MAX_EMAIL_LENGTH {
            return Err("Please enter a valid email address".to_string());
        }
        if email.chars().any(char::is_control) {
            return Err("Please enter a valid email address".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }
        if self.password.chars().count() > MAX_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            ));
        }
        Ok(())
    }

    /// Send the form through the session manager.
    ///
    /// On failure the message is kept in `error`. The password is cleared
    /// either way.
    pub async fn submit(&mut self, manager: &SessionManager) -> Option<AuthResult> {
        if let Err(message) = self.validate() {
            debug!(%message, "Form rejected before submission");
            self.error = Some(message);
            return None;
        }

        self.error = None;
        self.is_loading = true;

        let email = self.email.trim().to_string();
        let outcome = manager.authenticate(self.mode, &email, &self.password).await;

        self.is_loading = false;
        self.password.clear();

        match outcome {
            Ok(result) => {
                info!(mode = ?self.mode, "Form submitted");
                Some(result)
            }
            Err(e) => {
                error!(error = ?e, "Form submission failed");
                self.error = Some(e.user_message());
                None
            }
        }
    }
}
