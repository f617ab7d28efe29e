//! `fixdesk-auth`: pure authorization boundary.
//!
//! This crate is intentionally decoupled from transport and storage: the
//! capability table is a pure function from (actor, action, target) to a
//! decision, and the identity resolver is a trait the caller implements.

pub mod action;
pub mod authorize;
pub mod identity;
pub mod roles;
pub mod user;

pub use action::Action;
pub use authorize::{Actor, AuthzError, TargetContext, authorize};
pub use identity::{UserDirectory, UserRecord, resolve_or_provision};
pub use roles::Role;
pub use user::{User, UserCommand, UserEvent, UserStatus};
