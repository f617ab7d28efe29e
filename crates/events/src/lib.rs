//! `fixdesk-events`: domain events and the pub/sub boundary.
//!
//! Lifecycle transitions are communicated outward as events; the external
//! notification dispatcher subscribes to the bus and decides recipients and
//! content. This crate stays transport-agnostic.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
