//! Wire payloads for the auth (`/auth/v1`) and REST (`/rest/v1`) endpoints.
//! Token responses carry bearer credentials, so these types must never be
//! logged with `{:?}` outside of tests.

use crate::session::types::Identity;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Bearer credential issued by the identity service.
#[derive(Clone)]
pub struct Credential {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Expiry of the access token, unix seconds.
    pub expires_at: u64,
}

impl Credential {
    /// True when the access token expires within `leeway_secs`.
    #[must_use]
    pub fn expires_within(&self, leeway_secs: u64) -> bool {
        self.expires_at <= unix_now().saturating_add(leeway_secs)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// On-disk form of [`Credential`].
#[derive(Serialize, Deserialize)]
pub(crate) struct StoredCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: u64,
}

impl From<&Credential> for StoredCredential {
    fn from(credential: &Credential) -> Self {
        Self {
            access_token: credential.access_token.expose_secret().to_string(),
            refresh_token: credential.refresh_token.expose_secret().to_string(),
            expires_at: credential.expires_at,
        }
    }
}

impl From<StoredCredential> for Credential {
    fn from(stored: StoredCredential) -> Self {
        Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: SecretString::from(stored.refresh_token),
            expires_at: stored.expires_at,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PasswordGrantRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshGrantRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserRecord> for Identity {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<u64>,
    pub user: UserRecord,
}

impl TokenResponse {
    pub fn into_parts(self) -> (Credential, Identity) {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| unix_now().saturating_add(self.expires_in.unwrap_or(3600)));
        let credential = Credential {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
        };
        (credential, self.user.into())
    }
}

/// Sign-up returns a full token response when email confirmation is off and
/// a bare user record when it is on.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(TokenResponse),
    User(UserRecord),
}

#[derive(Deserialize)]
pub(crate) struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_redacts_tokens() {
        let credential = Credential {
            access_token: SecretString::from("access-secret".to_string()),
            refresh_token: SecretString::from("refresh-secret".to_string()),
            expires_at: 42,
        };
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
        assert!(rendered.contains("42"));
    }

    #[test]
    fn token_response_uses_expires_in_when_expires_at_missing() -> Result<(), serde_json::Error> {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":60,"user":{"id":"u-1","email":"ana@totc.dev"}}"#,
        )?;
        let before = unix_now();
        let (credential, identity) = response.into_parts();
        assert!(credential.expires_at >= before + 60);
        assert!(!credential.expires_within(0));
        assert!(credential.expires_within(120));
        assert_eq!(identity.id, "u-1");
        assert_eq!(identity.email, "ana@totc.dev");
        Ok(())
    }

    #[test]
    fn sign_up_response_distinguishes_session_from_user() -> Result<(), serde_json::Error> {
        let session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_at":99,"user":{"id":"u-1","email":"a@b.c"}}"#,
        )?;
        assert!(matches!(session, SignUpResponse::Session(_)));

        let user: SignUpResponse = serde_json::from_str(r#"{"id":"u-2","email":"a@b.c"}"#)?;
        assert!(matches!(user, SignUpResponse::User(_)));
        Ok(())
    }
}
