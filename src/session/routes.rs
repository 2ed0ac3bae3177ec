//! Declarative route table. Paths use `:name` segments for parameters;
//! anything unmatched falls back to a redirect to `/`. Declarations are
//! validated when the table is built, so an unknown role never reaches the
//! guard.

use super::{
    guard::{decide, GuardDecision},
    types::{Role, RouteRequirement, Session},
};
use crate::error::GuardMisconfiguration;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(RouteRequirement),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub access: Access,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// One entry of a route file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RouteDeclaration {
    pub path: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub public: bool,
}

impl RouteDeclaration {
    #[must_use]
    pub fn public(path: &str) -> Self {
        Self {
            path: path.to_string(),
            role: None,
            public: true,
        }
    }

    #[must_use]
    pub fn protected(path: &str, role: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            role: role.map(str::to_string),
            public: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectReason {
    Unauthenticated,
    WrongRole,
    UnknownPath,
}

/// What the shell should do for a requested path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Session not ready: show a neutral placeholder.
    Pending,
    Render {
        path: String,
        params: BTreeMap<String, String>,
    },
    Redirect {
        to: String,
        reason: RedirectReason,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Builds a table from ordered declarations.
    ///
    /// # Errors
    /// Returns `GuardMisconfiguration` for unknown roles, paths not starting
    /// with `/`, duplicate paths, or public routes that name a role.
    pub fn from_declarations(
        declarations: &[RouteDeclaration],
    ) -> Result<Self, GuardMisconfiguration> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(declarations.len());

        for declaration in declarations {
            let path = normalize_path(&declaration.path);
            if !declaration.path.trim().starts_with('/') {
                return Err(GuardMisconfiguration::InvalidPath(declaration.path.clone()));
            }
            let segments = parse_segments(&path);
            if !seen.insert(shape_of(&segments)) {
                return Err(GuardMisconfiguration::DuplicatePath(path));
            }

            let access = match (&declaration.role, declaration.public) {
                (Some(_), true) => return Err(GuardMisconfiguration::PublicWithRole(path)),
                (None, true) => Access::Public,
                (None, false) => Access::Protected(RouteRequirement::authenticated()),
                (Some(role), false) => {
                    let role = role.parse::<Role>().map_err(|_| {
                        GuardMisconfiguration::UnknownRole {
                            path: path.clone(),
                            role: role.clone(),
                        }
                    })?;
                    Access::Protected(RouteRequirement::role(role))
                }
            };

            routes.push(Route {
                path,
                access,
                segments,
            });
        }

        Ok(Self { routes })
    }

    /// Parses a JSON array of [`RouteDeclaration`]s.
    ///
    /// # Errors
    /// Returns `GuardMisconfiguration::Parse` for malformed JSON and any
    /// validation error from [`RouteTable::from_declarations`].
    pub fn from_json(raw: &str) -> Result<Self, GuardMisconfiguration> {
        let declarations: Vec<RouteDeclaration> = serde_json::from_str(raw)
            .map_err(|err| GuardMisconfiguration::Parse(err.to_string()))?;
        Self::from_declarations(&declarations)
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route matching `path`, with its captured parameters.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<(&Route, BTreeMap<String, String>)> {
        let normalized = normalize_path(path);
        let requested: Vec<&str> = split(&normalized).collect();

        self.routes
            .iter()
            .find_map(|route| route.capture(&requested).map(|params| (route, params)))
    }

    /// Resolves and guards `path` for `session`.
    #[must_use]
    pub fn navigate(&self, session: &Session, path: &str) -> Navigation {
        let Some((route, params)) = self.resolve(path) else {
            return Navigation::Redirect {
                to: HOME_PATH.to_string(),
                reason: RedirectReason::UnknownPath,
            };
        };

        let render = Navigation::Render {
            path: normalize_path(path),
            params,
        };
        let Access::Protected(requirement) = route.access else {
            return render;
        };

        match decide(session, &requirement) {
            GuardDecision::Pending => Navigation::Pending,
            GuardDecision::Allow => render,
            GuardDecision::RedirectToLogin => Navigation::Redirect {
                to: LOGIN_PATH.to_string(),
                reason: RedirectReason::Unauthenticated,
            },
            GuardDecision::RedirectToDefault => Navigation::Redirect {
                to: session.landing_path().to_string(),
                reason: RedirectReason::WrongRole,
            },
        }
    }
}

impl Default for RouteTable {
    /// Routes of the TOTC marketplace front-end.
    fn default() -> Self {
        let authenticated = Access::Protected(RouteRequirement::authenticated());
        let role = |role| Access::Protected(RouteRequirement::role(role));

        let routes = [
            ("/", Access::Public),
            ("/home", Access::Public),
            ("/catalog", Access::Public),
            ("/catalog/checkout/:id", Access::Public),
            ("/courses", Access::Public),
            ("/courses/:id", Access::Public),
            ("/courses/checkout/:id", Access::Public),
            (LOGIN_PATH, Access::Public),
            ("/register", Access::Public),
            ("/dashboard", role(Role::Student)),
            ("/instructor", role(Role::Instructor)),
            ("/admin", role(Role::Admin)),
            ("/course/:id", authenticated),
            ("/lesson/:courseId/:lessonId", authenticated),
            ("/profile", authenticated),
            ("/settings", authenticated),
        ]
        .into_iter()
        .map(|(path, access)| Route::new(path, access))
        .collect();

        Self { routes }
    }
}

/// Resolves and guards `path` against `table`.
#[must_use]
pub fn navigate(table: &RouteTable, session: &Session, path: &str) -> Navigation {
    table.navigate(session, path)
}

impl Route {
    fn new(path: &str, access: Access) -> Self {
        let path = normalize_path(path);
        let segments = parse_segments(&path);
        Self {
            path,
            access,
            segments,
        }
    }

    fn capture(&self, requested: &[&str]) -> Option<BTreeMap<String, String>> {
        if requested.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, value) in self.segments.iter().zip(requested) {
            match segment {
                Segment::Literal(literal) if literal == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }
        Some(params)
    }
}

/// Strips query string, fragment and trailing slashes.
fn normalize_path(path: &str) -> String {
    let path = path.trim();
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn parse_segments(path: &str) -> Vec<Segment> {
    split(path)
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(segment.to_string()),
        })
        .collect()
}

/// Path with parameter names erased, used to detect duplicates.
fn shape_of(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(literal) => literal.as_str(),
            Segment::Param(_) => ":",
        })
        .collect::<Vec<_>>()
        .join("/")
}
