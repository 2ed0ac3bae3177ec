use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Authenticated principal as known to the identity service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Coarse authorization label gating route access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Page a user with this role lands on after sign-in or a wrong-role redirect.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::Student => "/dashboard",
            Self::Instructor => "/instructor",
            Self::Admin => "/admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

/// Local projection of the authentication state.
///
/// `ready` means the bootstrap decision has been made, not that someone is
/// signed in. Every value published after bootstrap has `ready == true`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub ready: bool,
}

impl Session {
    /// Session before the bootstrap check resolves.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            identity: None,
            role: None,
            ready: false,
        }
    }

    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            identity: None,
            role: None,
            ready: true,
        }
    }

    #[must_use]
    pub const fn signed_in(identity: Identity, role: Option<Role>) -> Self {
        Self {
            identity: Some(identity),
            role,
            ready: true,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Landing page for this session; `/` when the role is unknown.
    #[must_use]
    pub fn landing_path(&self) -> &'static str {
        match (&self.identity, self.role) {
            (Some(_), Some(role)) => role.landing_path(),
            _ => "/",
        }
    }
}

/// Role requirement attached to a protected route. `None` accepts any
/// authenticated identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub required_role: Option<Role>,
}

impl RouteRequirement {
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            required_role: None,
        }
    }

    #[must_use]
    pub const fn role(role: Role) -> Self {
        Self {
            required_role: Some(role),
        }
    }
}
