//! Route guard: maps a session and a route requirement to a navigation
//! decision. The decision is pure; callers log it and act on it.

use crate::session::types::{RouteRequirement, Session};

/// Outcome of guarding a protected route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not ready yet: render nothing, never redirect.
    Pending,
    Allow,
    RedirectToLogin,
    /// Signed in with the wrong role: send the user to their own landing page.
    RedirectToDefault,
}

/// State of the guard for a single route render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Pending,
    Unauthenticated,
    WrongRole,
    Authorized,
}

impl GuardState {
    #[must_use]
    pub fn of(session: &Session, requirement: &RouteRequirement) -> Self {
        match decide(session, requirement) {
            GuardDecision::Pending => Self::Pending,
            GuardDecision::RedirectToLogin => Self::Unauthenticated,
            GuardDecision::RedirectToDefault => Self::WrongRole,
            GuardDecision::Allow => Self::Authorized,
        }
    }
}

#[must_use]
pub fn decide(session: &Session, requirement: &RouteRequirement) -> GuardDecision {
    if !session.ready {
        return GuardDecision::Pending;
    }
    if session.identity.is_none() {
        return GuardDecision::RedirectToLogin;
    }
    match requirement.required_role {
        None => GuardDecision::Allow,
        Some(required) if session.role == Some(required) => GuardDecision::Allow,
        Some(_) => GuardDecision::RedirectToDefault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{Identity, Role};

    const ROLES: [Option<Role>; 4] = [
        None,
        Some(Role::Student),
        Some(Role::Instructor),
        Some(Role::Admin),
    ];

    fn identity() -> Identity {
        Identity {
            id: "2b7c0e7e-0000-4000-8000-000000000001".to_string(),
            email: "student@totc.dev".to_string(),
        }
    }

    fn sessions() -> Vec<Session> {
        let mut all = Vec::new();
        for ready in [false, true] {
            for role in ROLES {
                for identity in [None, Some(identity())] {
                    all.push(Session {
                        identity,
                        role,
                        ready,
                    });
                }
            }
        }
        all
    }

    fn requirements() -> Vec<RouteRequirement> {
        ROLES
            .iter()
            .map(|role| RouteRequirement {
                required_role: *role,
            })
            .collect()
    }

    #[test]
    fn not_ready_is_always_pending() {
        for session in sessions().into_iter().filter(|s| !s.ready) {
            for requirement in requirements() {
                assert_eq!(
                    decide(&session, &requirement),
                    GuardDecision::Pending,
                    "{session:?} / {requirement:?}"
                );
            }
        }
    }

    #[test]
    fn ready_without_identity_redirects_to_login() {
        for session in sessions()
            .into_iter()
            .filter(|s| s.ready && s.identity.is_none())
        {
            for requirement in requirements() {
                assert_eq!(
                    decide(&session, &requirement),
                    GuardDecision::RedirectToLogin
                );
            }
        }
    }

    #[test]
    fn role_agnostic_requirement_allows_any_identity() {
        for session in sessions()
            .into_iter()
            .filter(|s| s.ready && s.identity.is_some())
        {
            assert_eq!(
                decide(&session, &RouteRequirement::authenticated()),
                GuardDecision::Allow
            );
        }
    }

    #[test]
    fn role_specific_requirement_needs_exact_match() {
        for session in sessions()
            .into_iter()
            .filter(|s| s.ready && s.identity.is_some())
        {
            for role in [Role::Student, Role::Instructor, Role::Admin] {
                let expected = if session.role == Some(role) {
                    GuardDecision::Allow
                } else {
                    GuardDecision::RedirectToDefault
                };
                assert_eq!(decide(&session, &RouteRequirement::role(role)), expected);
            }
        }
    }

    #[test]
    fn unknown_role_never_satisfies_a_specific_role() {
        let session = Session::signed_in(identity(), None);
        assert_eq!(
            decide(&session, &RouteRequirement::role(Role::Student)),
            GuardDecision::RedirectToDefault
        );
        assert_eq!(
            decide(&session, &RouteRequirement::authenticated()),
            GuardDecision::Allow
        );
    }

    #[test]
    fn guard_state_tracks_decision() {
        let requirement = RouteRequirement::role(Role::Admin);
        assert_eq!(
            GuardState::of(&Session::pending(), &requirement),
            GuardState::Pending
        );
        assert_eq!(
            GuardState::of(&Session::signed_out(), &requirement),
            GuardState::Unauthenticated
        );
        assert_eq!(
            GuardState::of(
                &Session::signed_in(identity(), Some(Role::Student)),
                &requirement
            ),
            GuardState::WrongRole
        );
        assert_eq!(
            GuardState::of(
                &Session::signed_in(identity(), Some(Role::Admin)),
                &requirement
            ),
            GuardState::Authorized
        );
    }
}
