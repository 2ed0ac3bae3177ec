//! Auth facade: the only handle consumers use to read the session or to sign
//! in and out. Reads return owned snapshots, so a consumer never sees one
//! field updated without the other.

use super::{
    guard::{decide, GuardDecision},
    routes::{Navigation, RouteTable},
    store::{Credentials, NewAccount, Registration, SessionStore, Subscription},
    types::{Identity, Role, RouteRequirement, Session},
};
use crate::error::AuthError;
use crate::identity::IdentityService;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub struct AuthFacade<S> {
    store: Arc<SessionStore<S>>,
}

impl<S> Clone for AuthFacade<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: IdentityService + 'static> AuthFacade<S> {
    #[must_use]
    pub fn new(store: Arc<SessionStore<S>>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.session().identity
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session().role
    }

    #[must_use]
    pub fn ready(&self) -> bool {
        self.session().ready
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    #[must_use]
    pub fn landing_path(&self) -> &'static str {
        self.session().landing_path()
    }

    /// Receiver that wakes on every session change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.store.watch()
    }

    pub async fn initialize(&self) -> Session {
        self.store.initialize().await
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    /// # Errors
    /// Returns `AuthError` when the credentials are rejected or the service is
    /// unreachable.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.store.login(credentials).await
    }

    /// # Errors
    /// Returns `AuthError` when the form is invalid or sign-up fails.
    pub async fn register(&self, account: &NewAccount) -> Result<Registration, AuthError> {
        self.store.register(account).await
    }

    pub async fn logout(&self) {
        self.store.logout().await;
    }

    /// Guard decision for `requirement` against the current session.
    #[must_use]
    pub fn decide(&self, requirement: &RouteRequirement) -> GuardDecision {
        let session = self.session();
        let decision = decide(&session, requirement);
        debug!(
            required_role = ?requirement.required_role,
            role = ?session.role,
            ready = session.ready,
            ?decision,
            "route guard decision"
        );
        decision
    }

    /// Resolves `path` against `routes` and guards it.
    #[must_use]
    pub fn navigate(&self, routes: &RouteTable, path: &str) -> Navigation {
        let session = self.session();
        let navigation = routes.navigate(&session, path);
        debug!(path, ?navigation, "navigation");
        navigation
    }
}
