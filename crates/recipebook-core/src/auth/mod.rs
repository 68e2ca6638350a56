//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `Session`: The signed-in user and their bearer token with its expiry
//! - `SessionStore`: Persistence of the session record to the data directory
//! - `SessionManager`: Sign-up/login, session broadcast, restore and auto-logout
//!
//! A session lasts as long as the token lifetime the identity provider
//! reports; the manager logs out when it elapses.

pub mod manager;
pub mod session;
pub mod storage;

pub use manager::{AuthMode, SessionManager};
pub use session::{Session, SessionRecord, SESSION_STORAGE_KEY};
pub use storage::SessionStore;
