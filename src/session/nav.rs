//! Navigation shell links, derived from the session alone.

use super::types::{Role, Session};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub target: &'static str,
}

impl NavLink {
    const fn new(label: &'static str, target: &'static str) -> Self {
        Self { label, target }
    }
}

impl fmt::Display for NavLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.target)
    }
}

/// Links shown in the navigation bar. Until the session is ready only the
/// public links are offered, so a refresh never flashes Login for a user who
/// is about to be restored.
#[must_use]
pub fn nav_links(session: &Session) -> Vec<NavLink> {
    let mut links = vec![NavLink::new("Home", "/"), NavLink::new("Courses", "/courses")];

    if !session.ready {
        return links;
    }

    if session.is_authenticated() {
        match session.role {
            Some(Role::Admin) => links.push(NavLink::new("Admin", "/admin")),
            Some(Role::Instructor) => {
                links.push(NavLink::new("Instructor Dashboard", "/instructor"));
            }
            Some(Role::Student) | None => {}
        }
        links.push(NavLink::new("Dashboard", session.landing_path()));
        links.push(NavLink::new("Profile", "/profile"));
    } else {
        links.push(NavLink::new("Login", "/login"));
        links.push(NavLink::new("Sign Up", "/register"));
    }

    links
}
