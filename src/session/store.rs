//! Session store: owns the single [`Session`] value and keeps it in sync with
//! the identity service.
//!
//! Three sources write the session: the one-time bootstrap, the push
//! subscription, and explicit login/register/logout calls. All of them go
//! through [`SessionStore::apply`], which replaces the whole value at once and
//! drops results that were issued before an update that has already been
//! applied. A notification that lands while the bootstrap request is still in
//! flight therefore wins over the bootstrap result.

use crate::error::AuthError;
use crate::identity::{IdentityService, NewProfile, SessionEvent, SignUpOutcome};
use crate::session::types::{Identity, Role, Session};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Upper bound on the bootstrap check before giving up and resolving to
/// signed-out.
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Email/password pair submitted by the login form.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Sign-up form.
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: SecretString,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"***")
            .field("full_name", &self.full_name)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish()
    }
}

/// Outcome of [`SessionStore::register`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    SignedIn(Session),
    ConfirmationRequired { email: String },
}

pub struct SessionStore<S> {
    service: Arc<S>,
    state: watch::Sender<Session>,
    issued: AtomicU64,
    applied: AtomicU64,
    bootstrap_timeout: Duration,
}

impl<S: IdentityService + 'static> SessionStore<S> {
    #[must_use]
    pub fn new(service: Arc<S>) -> Self {
        Self::with_bootstrap_timeout(service, DEFAULT_BOOTSTRAP_TIMEOUT)
    }

    #[must_use]
    pub fn with_bootstrap_timeout(service: Arc<S>, bootstrap_timeout: Duration) -> Self {
        let (state, _) = watch::channel(Session::pending());
        Self {
            service,
            state,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            bootstrap_timeout,
        }
    }

    /// Current session value.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every applied update.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Bootstrap check. Always leaves the session ready: network failures and
    /// timeouts resolve to signed-out.
    pub async fn initialize(&self) -> Session {
        let ticket = self.issue();

        let derived = tokio::time::timeout(self.bootstrap_timeout, async {
            match self.service.restore_session().await {
                Ok(identity) => self.derive(identity).await,
                Err(err) => {
                    warn!("session bootstrap failed: {err}");
                    Session::signed_out()
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            warn!(
                timeout_secs = self.bootstrap_timeout.as_secs(),
                "session bootstrap timed out"
            );
            Session::signed_out()
        });

        if !self.apply(ticket, derived) {
            debug!("bootstrap result superseded by a newer update");
        }
        self.snapshot()
    }

    /// Follows the identity service's session notifications until the returned
    /// handle is dropped.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let mut events = self.service.session_changes();
        let store = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => store.on_session_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session notifications dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { handle }
    }

    /// Verifies credentials and publishes the new session. On failure the
    /// session is left as it was.
    ///
    /// # Errors
    /// Returns `AuthError` for invalid input, rejected credentials or transport
    /// failures.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = validate_email(&credentials.email)?;
        if credentials.password.expose_secret().is_empty() {
            return Err(AuthError::InvalidInput(
                "Please fill in all fields".to_string(),
            ));
        }

        let identity = self
            .service
            .verify_credentials(email, &credentials.password)
            .await?;
        // Ordered after verification so the new identity supersedes anything
        // applied while the request was in flight.
        let ticket = self.issue();
        let session = self.derive(Some(identity)).await;
        self.apply(ticket, session);
        Ok(self.snapshot())
    }

    /// Creates the account and its profile, then publishes the session.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidInput` for incomplete forms or a self-assigned
    /// admin role, otherwise the service's sign-up or profile error.
    pub async fn register(&self, account: &NewAccount) -> Result<Registration, AuthError> {
        let email = validate_email(&account.email)?;
        let full_name = account.full_name.trim();
        if full_name.is_empty() || account.password.expose_secret().is_empty() {
            return Err(AuthError::InvalidInput(
                "Please fill in all required fields".to_string(),
            ));
        }
        if account.role == Role::Admin {
            return Err(AuthError::InvalidInput(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        let identity = match self.service.sign_up(email, &account.password).await? {
            SignUpOutcome::SignedIn(identity) => identity,
            SignUpOutcome::ConfirmationRequired(identity) => {
                info!(user_id = %identity.id, "sign-up awaiting email confirmation");
                return Ok(Registration::ConfirmationRequired {
                    email: email.to_string(),
                });
            }
        };

        let profile = NewProfile {
            id: identity.id.clone(),
            full_name: full_name.to_string(),
            phone: account
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|phone| !phone.is_empty())
                .map(str::to_string),
            role: account.role,
        };
        self.service.insert_profile(&profile).await?;

        // The sign-in notification may already have published this identity
        // without a role; the profile written above settles it.
        let ticket = self.issue();
        self.apply(ticket, Session::signed_in(identity, Some(account.role)));
        Ok(Registration::SignedIn(self.snapshot()))
    }

    /// Clears the session locally, then asks the service to revoke it. The
    /// local clear stands even if the network call fails.
    pub async fn logout(&self) {
        let ticket = self.issue();
        self.apply(ticket, Session::signed_out());

        if let Err(err) = self.service.invalidate_session().await {
            warn!("remote sign-out failed: {err}");
        }
    }

    async fn on_session_event(&self, event: SessionEvent) {
        let ticket = self.issue();
        debug!(?event, "session notification");
        let session = self.derive(event.identity().cloned()).await;
        self.apply(ticket, session);
    }

    /// Resolves the role for an identity. A failed profile lookup leaves the
    /// role unknown.
    async fn derive(&self, identity: Option<Identity>) -> Session {
        let Some(identity) = identity else {
            return Session::signed_out();
        };

        let role = match self.service.fetch_profile(&identity.id).await {
            Ok(profile) => Some(profile.role),
            Err(err) => {
                warn!(user_id = %identity.id, "role lookup failed: {err}");
                None
            }
        };
        Session::signed_in(identity, role)
    }

    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publishes `next` unless an update issued after `ticket` has already
    /// been applied. Returns whether the value was published.
    fn apply(&self, ticket: u64, next: Session) -> bool {
        self.state.send_if_modified(|current| {
            if ticket <= self.applied.load(Ordering::Acquire) {
                return false;
            }
            self.applied.store(ticket, Ordering::Release);
            *current = next;
            true
        })
    }
}

/// Active push subscription; unsubscribes when dropped.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stops listening for notifications. Dropping the subscription does the same.
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

fn validate_email(email: &str) -> Result<&str, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidInput(
            "Please fill in all fields".to_string(),
        ));
    }
    if !valid_email(email) {
        return Err(AuthError::InvalidInput(format!(
            "Invalid email address: {email}"
        )));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_email_trims_and_checks_shape() {
        assert_eq!(validate_email("  ana@totc.dev "), Ok("ana@totc.dev"));
        assert!(matches!(
            validate_email(""),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_email("ana.totc.dev"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_email("ana@totc"),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials {
            email: "ana@totc.dev".to_string(),
            password: SecretString::from("hunter2".to_string()),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("ana@totc.dev"));
        assert!(!rendered.contains("hunter2"));
    }
}
