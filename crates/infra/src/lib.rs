//! `fixdesk-infra`: persistence, dispatch, and delivery plumbing.
//!
//! Everything here composes the domain crates through traits; the in-memory
//! implementations back tests and development, with real backends slotting in
//! behind the same interfaces.

pub mod command_dispatcher;
pub mod directory;
pub mod event_store;
pub mod notify;
pub mod sequence;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use directory::InMemoryDirectory;
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use notify::{LifecycleNotice, LogNotifier, Notifier};
pub use sequence::{InMemorySequenceAllocator, SequenceAllocator, SequenceError};
