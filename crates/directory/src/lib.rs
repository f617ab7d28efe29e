//! `fixdesk-directory`: organizational structure (departments).

pub mod department;

pub use department::{Department, DepartmentCommand, DepartmentEvent};
