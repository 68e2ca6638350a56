//! REST client module for the hosted identity provider.
//!
//! This module provides the `IdentityClient` for the sign-up and
//! password sign-in endpoints, and the `AuthError` taxonomy that
//! provider failures are mapped into.

pub mod client;
pub mod error;

pub use client::{AuthResult, IdentityClient, DEFAULT_IDENTITY_BASE_URL, MAX_EXPIRES_IN_SECS};
pub use error::AuthError;
