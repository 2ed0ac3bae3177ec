use thiserror::Error;

/// Transport-level failure talking to the identity service.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failure of a login or registration attempt. Shown to the user as a
/// form-level message; never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Sign-up rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Role resolution failed after the identity was established. Recovered
/// locally by treating the role as unknown.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProfileLookupError {
    #[error("profile not found for {0}")]
    NotFound(String),
    #[error("profile has unknown role: {0}")]
    UnknownRole(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// A route declaration that can never be satisfied correctly.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GuardMisconfiguration {
    #[error("route {path} requires unknown role {role:?}")]
    UnknownRole { path: String, role: String },
    #[error("route path must start with '/': {0:?}")]
    InvalidPath(String),
    #[error("route {0} is declared more than once")]
    DuplicatePath(String),
    #[error("public route {0} cannot require a role")]
    PublicWithRole(String),
    #[error("failed to parse route declarations: {0}")]
    Parse(String),
}
