//! Contract with the remote identity service plus its HTTP implementation.
//!
//! The service owns credential verification, session tokens and the
//! `profiles` table. Implementations keep the current credential themselves
//! and announce every change of signed-in identity on the
//! [`IdentityService::session_changes`] channel; the session store listens to
//! that channel and re-derives its state. Implementations must never log token
//! material or passwords.

pub mod client;
pub mod credentials;
mod types;

use crate::error::{AuthError, ProfileLookupError, ServiceError};
use crate::session::types::{Identity, Role};
use secrecy::SecretString;
use std::future::Future;
use tokio::sync::broadcast;

pub use types::Credential;

/// Capacity of the session-change broadcast channel.
pub const SESSION_EVENT_CAPACITY: usize = 16;

/// Push notification about the signed-in identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Identity),
    TokenRefreshed(Identity),
    SignedOut,
}

impl SessionEvent {
    /// Identity carried by the event, `None` once signed out.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedIn(identity) | Self::TokenRefreshed(identity) => Some(identity),
            Self::SignedOut => None,
        }
    }
}

/// Row of the `profiles` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub role: Role,
}

/// Profile written right after sign-up.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct NewProfile {
    pub id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
}

/// Result of a sign-up request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The service issued a session right away.
    SignedIn(Identity),
    /// The account exists but the email address must be confirmed first.
    ConfirmationRequired(Identity),
}

pub trait IdentityService: Send + Sync {
    /// Restores the session from the cached credential, if any. Called once at
    /// bootstrap. A missing or rejected credential yields `Ok(None)`.
    fn restore_session(
        &self,
    ) -> impl Future<Output = Result<Option<Identity>, ServiceError>> + Send;

    /// Verifies email/password and keeps the issued credential.
    fn verify_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<SignUpOutcome, AuthError>> + Send;

    /// Drops the local credential and asks the service to revoke it.
    fn invalidate_session(&self) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn fetch_profile(
        &self,
        identity_id: &str,
    ) -> impl Future<Output = Result<Profile, ProfileLookupError>> + Send;

    fn insert_profile(
        &self,
        profile: &NewProfile,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn session_changes(&self) -> broadcast::Receiver<SessionEvent>;
}
