//! `fixdesk-service`: application layer tying authorization, lifecycles,
//! and delivery together behind one typed API.

pub mod error;
pub mod request;
pub mod service;

pub use error::ServiceError;
pub use request::{NewCall, NewWorkOrder, Outcome};
pub use service::{InMemoryTicketService, TicketService};
