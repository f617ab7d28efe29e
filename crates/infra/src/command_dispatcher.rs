//! Command execution pipeline.
//!
//! The dispatcher runs the same lifecycle for every aggregate:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply history)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus
//! ```
//!
//! Events are persisted before publication, so a publish failure leaves the
//! facts committed; retrying delivery gives at-least-once semantics and
//! subscribers must be idempotent.
//!
//! Concurrency: the expected version is taken from the loaded stream, and the
//! append fails with [`DispatchError::Concurrency`] if another writer got in
//! between. Callers retry by re-executing the command against fresh state,
//! which re-runs all lifecycle rules against the state that actually won.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use fixdesk_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use fixdesk_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale aggregate version).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    /// Domain validation failure (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// A lifecycle transition not reachable from the current state.
    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
    /// Domain authorization failure.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Domain-level not found.
    #[error("not found")]
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate event type.
    #[error("event deserialization failed: {0}")]
    Deserialize(String),
    /// Persisting to the event store failed.
    #[error("event store error: {0}")]
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::InvalidTransition { from, to } => {
                DispatchError::InvalidTransition { from, to }
            }
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Forbidden(msg) => DispatchError::Forbidden(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Composes an [`EventStore`] and an [`EventBus`]; in-memory implementations
/// back the tests, real backends slot in without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Rehydrate an aggregate from its stream without dispatching anything.
    ///
    /// Callers use this to inspect current state (e.g. to build an
    /// authorization target) before deciding which command to send.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Dispatch a command through the full pipeline.
    ///
    /// The `make_aggregate` closure produces a fresh, empty instance for
    /// rehydration (e.g. `MaintenanceCall::empty(id)`), keeping the dispatcher
    /// generic over aggregate construction.
    ///
    /// Returns the aggregate with the new events applied, plus the committed
    /// events with their assigned sequence numbers.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<(A, Vec<StoredEvent>), DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: fixdesk_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok((aggregate, vec![]));
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Publish committed events (after append)
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        for ev in &decided {
            aggregate.apply(ev);
        }

        Ok((aggregate, committed))
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Reject cross-stream data even if a buggy backend returns it, and ensure
    // the stream is monotonically increasing by sequence number.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!("loaded stream contains wrong aggregate_id at index {idx}"),
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!(
                    "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                    e.sequence_number
                ),
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    use fixdesk_core::{AggregateRoot, DepartmentId, UserId};
    use fixdesk_events::InMemoryEventBus;
    use fixdesk_tickets::call::{CallNumber, ReportCall};
    use fixdesk_tickets::{CallCommand, CallId, CallStatus, MaintenanceCall, Priority};

    use crate::event_store::InMemoryEventStore;

    fn report(call_id: CallId, reporter: UserId) -> CallCommand {
        CallCommand::Report(ReportCall {
            call_id,
            number: CallNumber::new(2024, 1),
            title: "Broken door closer".to_string(),
            description: "Main entrance door slams".to_string(),
            priority: Priority::Medium,
            reporter,
            department_id: DepartmentId::new(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_persists_publishes_and_returns_updated_state() {
        let store = Arc::new(InMemoryEventStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let dispatcher = CommandDispatcher::new(Arc::clone(&store), Arc::clone(&bus));

        let call_id = CallId::new(AggregateId::new());
        let (call, committed) = dispatcher
            .dispatch(
                call_id.0,
                "call",
                report(call_id, UserId::new()),
                |id| MaintenanceCall::empty(CallId::new(id)),
            )
            .unwrap();

        assert_eq!(call.status(), CallStatus::Open);
        assert_eq!(call.version(), 1);
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(committed[0].event_type, "call.reported");

        let envelope = sub.try_recv().unwrap();
        assert_eq!(envelope.aggregate_id(), call_id.0);
        assert_eq!(envelope.event_type(), "call.reported");
    }

    #[test]
    fn load_rehydrates_without_side_effects() {
        let store = Arc::new(InMemoryEventStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = CommandDispatcher::new(Arc::clone(&store), bus);

        let call_id = CallId::new(AggregateId::new());
        dispatcher
            .dispatch(call_id.0, "call", report(call_id, UserId::new()), |id| {
                MaintenanceCall::empty(CallId::new(id))
            })
            .unwrap();

        let call: MaintenanceCall = dispatcher
            .load(call_id.0, |id| MaintenanceCall::empty(CallId::new(id)))
            .unwrap();
        assert_eq!(call.status(), CallStatus::Open);
        assert_eq!(store.load_stream(call_id.0).unwrap().len(), 1);
    }

    #[test]
    fn domain_rejection_persists_nothing() {
        let store = Arc::new(InMemoryEventStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = CommandDispatcher::new(Arc::clone(&store), bus);

        let call_id = CallId::new(AggregateId::new());
        let mut cmd = report(call_id, UserId::new());
        if let CallCommand::Report(ref mut r) = cmd {
            r.title = String::new();
        }

        let err = dispatcher
            .dispatch(call_id.0, "call", cmd, |id| {
                MaintenanceCall::empty(CallId::new(id))
            })
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(store.load_stream(call_id.0).unwrap().is_empty());
    }
}
