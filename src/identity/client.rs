//! HTTP client for a Supabase-compatible identity service (GoTrue auth under
//! `/auth/v1`, PostgREST tables under `/rest/v1`). Every request carries the
//! public `apikey`; authenticated requests add the user's bearer token.
//!
//! The client owns the current credential, mirrors it into the optional
//! [`CredentialCache`], and broadcasts a [`SessionEvent`] whenever the signed-in
//! identity changes. A `401` on an authenticated request means the session
//! expired elsewhere: the credential is dropped and `SignedOut` is emitted.

use super::{
    credentials::CredentialCache,
    types::{
        unix_now, Credential, PasswordGrantRequest, ProfileRow, RefreshGrantRequest,
        SignUpResponse, TokenResponse, UserRecord,
    },
    IdentityService, NewProfile, Profile, SessionEvent, SignUpOutcome, SESSION_EVENT_CAPACITY,
};
use crate::error::{AuthError, ProfileLookupError, ServiceError};
use crate::session::types::{Identity, Role};
use crate::APP_USER_AGENT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

/// Request timeout applied to every call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;
/// Refresh the access token this many seconds before it expires.
const REFRESH_LEEWAY_SECS: u64 = 60;
/// Auto-refresh poll interval while nobody is signed in.
const IDLE_POLL: Duration = Duration::from_secs(30);
/// Auto-refresh retry delay after a transport failure.
const RETRY_DELAY: Duration = Duration::from_secs(10);
/// Shortest wait between two automatic refreshes.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

pub struct RemoteIdentityClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    cache: Option<CredentialCache>,
    credential: RwLock<Option<Credential>>,
    events: broadcast::Sender<SessionEvent>,
    min_refresh_interval: Duration,
}

impl std::fmt::Debug for RemoteIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteIdentityClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl RemoteIdentityClient {
    /// # Errors
    /// Returns `ServiceError::Config` if `base_url` is not an absolute http(s)
    /// URL or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        cache: Option<CredentialCache>,
    ) -> Result<Self, ServiceError> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| ServiceError::Config(format!("Failed to build HTTP client: {err}")))?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url,
            api_key,
            cache,
            credential: RwLock::new(None),
            events,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        })
    }

    /// Overrides the shortest wait between automatic refreshes.
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Exchanges the refresh token for a new credential and emits
    /// `TokenRefreshed`. A rejected refresh token signs the user out.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidCredentials` when there is no credential or
    /// the refresh token was rejected, `AuthError::Service` on transport errors.
    pub async fn refresh(&self) -> Result<Identity, AuthError> {
        let Some(current) = self.current().await else {
            return Err(AuthError::InvalidCredentials);
        };

        let url = self.endpoint("auth/v1/token")?;
        let body = RefreshGrantRequest {
            refresh_token: current.refresh_token.expose_secret(),
        };
        let request = self
            .http
            .post(url)
            .query(&[("grant_type", "refresh_token")])
            .json(&body);
        let response = self.send(request, "token.refresh").await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            info!("refresh token rejected; signing out");
            self.expire().await;
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(http_error(response).await.into());
        }

        let token: TokenResponse = parse_json(response).await?;
        let (credential, identity) = token.into_parts();
        self.set_credential(credential).await;
        self.emit(SessionEvent::TokenRefreshed(identity.clone()));
        Ok(identity)
    }

    /// Keeps the access token fresh until the returned handle is dropped.
    #[must_use]
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> AutoRefresh {
        let client = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let Some(expires_at) = client.current().await.map(|c| c.expires_at) else {
                    tokio::time::sleep(IDLE_POLL).await;
                    continue;
                };

                // Never zero, even for short-lived tokens or a skewed clock.
                let wait = Duration::from_secs(
                    expires_at
                        .saturating_sub(unix_now())
                        .saturating_sub(REFRESH_LEEWAY_SECS),
                )
                .max(client.min_refresh_interval);
                tokio::time::sleep(wait).await;

                match client.refresh().await {
                    Ok(identity) => debug!(user_id = %identity.id, "access token refreshed"),
                    Err(AuthError::Service(err)) => {
                        warn!("token refresh failed: {err}");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Err(err) => debug!("token refresh stopped: {err}"),
                }
            }
        });
        AutoRefresh { handle }
    }

    async fn current(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    async fn set_credential(&self, credential: Credential) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(&credential).await {
                warn!("failed to persist credential: {err}");
            }
        }
        *self.credential.write().await = Some(credential);
    }

    /// Drops the credential from memory and the cache.
    async fn clear_local(&self) -> Option<Credential> {
        let previous = self.credential.write().await.take();
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.clear().await {
                warn!("failed to clear cached credential: {err}");
            }
        }
        previous
    }

    /// Session ended outside this process (expired or revoked).
    async fn expire(&self) {
        if self.clear_local().await.is_some() {
            self.emit(SessionEvent::SignedOut);
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("no session listeners");
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ServiceError::Config(format!("Invalid endpoint {path}: {err}")))
    }

    /// Bearer value for REST calls: the user's token, or the anon key.
    async fn bearer(&self) -> String {
        match self.current().await {
            Some(credential) => credential.access_token.expose_secret().to_string(),
            None => self.api_key.expose_secret().to_string(),
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<Response, ServiceError> {
        let span = info_span!("identity.request", operation);
        request
            .header("apikey", self.api_key.expose_secret())
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)
    }

    async fn fetch_user(&self, credential: &Credential) -> Result<Option<Identity>, ServiceError> {
        let url = self.endpoint("auth/v1/user")?;
        let request = self
            .http
            .get(url)
            .bearer_auth(credential.access_token.expose_secret());
        let response = self.send(request, "user").await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserRecord = parse_json(response).await?;
                Ok(Some(user.into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("cached credential rejected");
                self.clear_local().await;
                Ok(None)
            }
            _ => Err(http_error(response).await),
        }
    }
}

impl IdentityService for RemoteIdentityClient {
    async fn restore_session(&self) -> Result<Option<Identity>, ServiceError> {
        let credential = match self.current().await {
            Some(credential) => Some(credential),
            None => match &self.cache {
                Some(cache) => cache.load().await,
                None => None,
            },
        };
        let Some(credential) = credential else {
            return Ok(None);
        };
        *self.credential.write().await = Some(credential.clone());

        if credential.expires_within(REFRESH_LEEWAY_SECS) {
            debug!("cached access token expired; refreshing");
            return match self.refresh().await {
                Ok(identity) => Ok(Some(identity)),
                Err(AuthError::Service(err)) => Err(err),
                Err(_) => Ok(None),
            };
        }

        self.fetch_user(&credential).await
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let url = self.endpoint("auth/v1/token")?;
        let body = PasswordGrantRequest {
            email,
            password: password.expose_secret(),
        };
        let request = self
            .http
            .post(url)
            .query(&[("grant_type", "password")])
            .json(&body);
        let response = self.send(request, "token.password").await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }
        if status == StatusCode::BAD_REQUEST {
            let message = error_message(response).await;
            if message.to_lowercase().contains("invalid login credentials") {
                return Err(AuthError::InvalidCredentials);
            }
            return Err(AuthError::Rejected(message));
        }
        if !status.is_success() {
            return Err(http_error(response).await.into());
        }

        let token: TokenResponse = parse_json(response).await?;
        let (credential, identity) = token.into_parts();
        self.set_credential(credential).await;
        info!(user_id = %identity.id, "signed in");
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        let url = self.endpoint("auth/v1/signup")?;
        let body = PasswordGrantRequest {
            email,
            password: password.expose_secret(),
        };
        let response = self.send(self.http.post(url).json(&body), "signup").await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::Rejected(error_message(response).await));
        }
        if !status.is_success() {
            return Err(http_error(response).await.into());
        }

        match parse_json::<SignUpResponse>(response).await? {
            SignUpResponse::Session(token) => {
                let (credential, identity) = token.into_parts();
                self.set_credential(credential).await;
                info!(user_id = %identity.id, "signed up");
                self.emit(SessionEvent::SignedIn(identity.clone()));
                Ok(SignUpOutcome::SignedIn(identity))
            }
            SignUpResponse::User(user) => Ok(SignUpOutcome::ConfirmationRequired(user.into())),
        }
    }

    async fn invalidate_session(&self) -> Result<(), ServiceError> {
        let Some(credential) = self.clear_local().await else {
            return Ok(());
        };
        self.emit(SessionEvent::SignedOut);

        let url = self.endpoint("auth/v1/logout")?;
        let request = self
            .http
            .post(url)
            .bearer_auth(credential.access_token.expose_secret());
        let response = self.send(request, "logout").await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already revoked or expired on the server.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(http_error(response).await),
        }
    }

    async fn fetch_profile(&self, identity_id: &str) -> Result<Profile, ProfileLookupError> {
        let url = self.endpoint("rest/v1/profiles")?;
        let request = self
            .http
            .get(url)
            .query(&[
                ("id", format!("eq.{identity_id}")),
                ("select", "id,full_name,role".to_string()),
            ])
            .bearer_auth(self.bearer().await);
        let response = self.send(request, "profiles.select").await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.expire().await;
        }
        if !status.is_success() {
            return Err(http_error(response).await.into());
        }

        let rows: Vec<ProfileRow> = parse_json(response).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ProfileLookupError::NotFound(identity_id.to_string()))?;
        let raw_role = row.role.unwrap_or_default();
        let role = raw_role
            .parse::<Role>()
            .map_err(|_| ProfileLookupError::UnknownRole(raw_role))?;

        Ok(Profile {
            id: row.id,
            full_name: row.full_name,
            role,
        })
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), ServiceError> {
        let url = self.endpoint("rest/v1/profiles")?;
        let request = self
            .http
            .post(url)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer().await)
            .json(profile);
        let response = self.send(request, "profiles.insert").await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.expire().await;
        }
        if status.is_success() {
            Ok(())
        } else {
            Err(http_error(response).await)
        }
    }

    fn session_changes(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Background token refresh; aborted when dropped.
#[derive(Debug)]
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Parses the base URL and guarantees a trailing slash so `join` appends.
fn normalize_base_url(raw: &str) -> Result<Url, ServiceError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| ServiceError::Config(format!("Invalid identity service URL: {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ServiceError::Config(format!(
            "Unsupported identity service URL scheme: {}",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn map_request_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout("Request timed out. Please try again.".to_string())
    } else {
        ServiceError::Network(format!("Unable to reach the identity service: {err}"))
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ServiceError::Parse(format!("Failed to decode response: {err}")))
}

async fn http_error(response: Response) -> ServiceError {
    let status = response.status().as_u16();
    ServiceError::Http {
        status,
        message: error_message(response).await,
    }
}

/// Extracts the service's error message from a JSON body, falling back to the
/// raw body.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or(body);
    sanitize_body(&message)
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
