use crate::cli::actions::Context;
use crate::identity::{client::RemoteIdentityClient, credentials::CredentialCache};
use crate::session::{AuthFacade, Credentials, NewAccount, Registration, Session, SessionStore};
use anyhow::{Context as _, Result};
use std::{fmt::Write as _, sync::Arc};
use tracing::debug;

pub type Facade = AuthFacade<RemoteIdentityClient>;

/// Builds the identity client and a facade over a fresh session store.
///
/// # Errors
/// Returns an error if the identity client cannot be built.
pub fn connect(context: &Context) -> Result<(Arc<RemoteIdentityClient>, Facade)> {
    let cache = context.identity.credentials.clone().map(CredentialCache::new);
    if let Some(cache) = &cache {
        debug!(path = %cache.path().display(), "using credential cache");
    }

    let client = RemoteIdentityClient::new(
        context.identity.url.as_str(),
        context.identity.anon_key.clone(),
        cache,
    )
    .context("Failed to configure the identity client")?;
    let client = Arc::new(client);

    let store = SessionStore::with_bootstrap_timeout(
        Arc::clone(&client),
        context.session.bootstrap_timeout,
    );
    Ok((client, AuthFacade::new(Arc::new(store))))
}

/// Human-readable summary of a session.
#[must_use]
pub fn describe(session: &Session) -> String {
    if !session.ready {
        return "session: pending".to_string();
    }
    let Some(identity) = &session.identity else {
        return "signed out".to_string();
    };

    let mut out = format!("signed in as {} ({})", identity.email, identity.id);
    let role = session.role.map_or("unknown", |role| role.as_str());
    let _ = write!(out, "\nrole: {role}");
    let _ = write!(out, "\nlanding page: {}", session.landing_path());
    out
}

/// # Errors
/// Returns an error if sign-in fails.
pub async fn login(context: &Context, credentials: &Credentials) -> Result<()> {
    let (_, facade) = connect(context)?;
    let session = facade.login(credentials).await.context("Sign in failed")?;
    println!("{}", describe(&session));
    Ok(())
}

/// # Errors
/// Returns an error if sign-up or the profile write fails.
pub async fn register(context: &Context, account: &NewAccount) -> Result<()> {
    let (_, facade) = connect(context)?;
    match facade.register(account).await.context("Sign up failed")? {
        Registration::SignedIn(session) => println!("{}", describe(&session)),
        Registration::ConfirmationRequired { email } => {
            println!("check {email} for a confirmation link, then run `totc login`");
        }
    }
    Ok(())
}

/// # Errors
/// Returns an error if the identity client cannot be built.
pub async fn logout(context: &Context) -> Result<()> {
    let (_, facade) = connect(context)?;
    // Restores the cached credential so the service can revoke it.
    facade.initialize().await;
    facade.logout().await;
    println!("{}", describe(&facade.session()));
    Ok(())
}

/// # Errors
/// Returns an error if the identity client cannot be built.
pub async fn whoami(context: &Context) -> Result<()> {
    let (_, facade) = connect(context)?;
    let session = facade.initialize().await;
    println!("{}", describe(&session));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Identity, Role};

    fn identity() -> Identity {
        Identity {
            id: "u-1".to_string(),
            email: "ana@totc.dev".to_string(),
        }
    }

    #[test]
    fn describe_covers_every_state() {
        assert_eq!(describe(&Session::pending()), "session: pending");
        assert_eq!(describe(&Session::signed_out()), "signed out");
        assert_eq!(
            describe(&Session::signed_in(identity(), Some(Role::Instructor))),
            "signed in as ana@totc.dev (u-1)\nrole: instructor\nlanding page: /instructor"
        );
        assert_eq!(
            describe(&Session::signed_in(identity(), None)),
            "signed in as ana@totc.dev (u-1)\nrole: unknown\nlanding page: /"
        );
    }
}
