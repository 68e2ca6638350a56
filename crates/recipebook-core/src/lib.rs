//! Core library for recipebook - identity API client, sessions, storage, auth.
//!
//! The front ends (terminal, GUI) drive a `SessionManager` and observe the
//! current session through the receiver returned by `subscribe()`.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{AuthError, AuthResult, IdentityClient};
pub use auth::{AuthMode, Session, SessionManager, SessionStore};
pub use config::Config;
