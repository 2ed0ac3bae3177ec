//! Session state, route guarding and the navigation shell.

pub mod facade;
pub mod guard;
pub mod nav;
pub mod routes;
pub mod store;
pub mod types;

pub use facade::AuthFacade;
pub use guard::{decide, GuardDecision, GuardState};
pub use nav::{nav_links, NavLink};
pub use routes::{Navigation, RedirectReason, RouteDeclaration, RouteTable};
pub use store::{Credentials, NewAccount, Registration, SessionStore, Subscription};
pub use types::{Identity, Role, RouteRequirement, Session};
