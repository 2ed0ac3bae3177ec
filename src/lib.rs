//! # TOTC (Session & Access-Control Core)
//!
//! `totc` is the client-side session core of the TOTC course marketplace. It
//! establishes who the user is, derives their role, and decides whether a
//! route may render.
//!
//! ## Session Lifecycle
//!
//! The [`session::SessionStore`] starts empty with `ready = false`. Bootstrap
//! restores a cached credential through the identity service, looks up the
//! caller's `profiles` record for the role, and flips `ready` to `true` whether
//! or not anyone was signed in. Push notifications from the identity service
//! (sign-in, token refresh, sign-out) re-derive the session through the same
//! update path.
//!
//! ## Access Control
//!
//! Routes declare a required role (or none). The [`session::guard::decide`]
//! function is pure and never redirects before the session is ready, so a page
//! refresh does not bounce an already signed-in user to `/login`. Users with
//! the wrong role are sent to their own landing page rather than an error page.
//!
//! ## Identity Service
//!
//! Authentication and profile storage live in a Supabase-compatible
//! backend-as-a-service. [`identity::client::RemoteIdentityClient`] speaks its
//! auth and REST endpoints; tests substitute in-memory implementations of
//! [`identity::IdentityService`].

pub mod cli;
pub mod error;
pub mod identity;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
