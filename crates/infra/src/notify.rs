//! Notification boundary.
//!
//! The lifecycle engine only publishes events; deciding recipients and
//! message content belongs to an external dispatcher. This module derives a
//! compact [`LifecycleNotice`] from published envelopes and hands it to a
//! [`Notifier`], of which [`LogNotifier`] is the built-in implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use fixdesk_core::{AggregateId, UserId};
use fixdesk_events::EventEnvelope;

/// What a subscriber needs to route a transition notification, without
/// deserializing the full event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleNotice {
    /// Aggregate type, e.g. `"call"` or `"workorder"`.
    pub entity_type: String,
    pub entity_id: AggregateId,
    /// Event type, e.g. `"call.assigned"`.
    pub transition: String,
    /// Who caused the transition, when the payload carries it.
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleNotice {
    /// Derive a notice from a published envelope.
    ///
    /// The actor is read from the payload's `actor_id` field where present
    /// (creation events name a `reporter` instead).
    pub fn from_envelope(envelope: &EventEnvelope<JsonValue>) -> Self {
        let payload = match envelope.payload() {
            JsonValue::Object(map) => map.values().next().and_then(JsonValue::as_object),
            _ => None,
        };
        let actor_id = payload
            .and_then(|inner| inner.get("actor_id").or_else(|| inner.get("reporter")))
            .and_then(JsonValue::as_str)
            .and_then(|s| s.parse().ok());

        Self {
            entity_type: envelope.aggregate_type().to_string(),
            entity_id: envelope.aggregate_id(),
            transition: envelope.event_type().to_string(),
            actor_id,
            occurred_at: envelope.occurred_at(),
        }
    }
}

/// Delivery seam for lifecycle notices.
///
/// Implementations decide recipients and channels; delivery failures must not
/// propagate back into command handling.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &LifecycleNotice);
}

/// Notifier that emits structured log records instead of delivering anywhere.
///
/// Used in development and tests, and as the fallback when no external
/// dispatcher is wired up.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notice: &LifecycleNotice) {
        tracing::info!(
            entity_type = %notice.entity_type,
            entity_id = %notice.entity_id,
            transition = %notice.transition,
            actor_id = ?notice.actor_id,
            occurred_at = %notice.occurred_at,
            "lifecycle transition"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn notice_extracts_actor_from_payload() {
        let actor = UserId::new();
        let aggregate_id = AggregateId::new();
        let occurred_at = Utc::now();
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            aggregate_id,
            "call",
            3,
            "call.assigned",
            occurred_at,
            json!({"Assigned": {"call_id": aggregate_id, "actor_id": actor}}),
        );

        let notice = LifecycleNotice::from_envelope(&envelope);
        assert_eq!(notice.entity_type, "call");
        assert_eq!(notice.entity_id, aggregate_id);
        assert_eq!(notice.transition, "call.assigned");
        assert_eq!(notice.actor_id, Some(actor));
        assert_eq!(notice.occurred_at, occurred_at);
    }

    #[test]
    fn creation_events_fall_back_to_reporter() {
        let reporter = UserId::new();
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            AggregateId::new(),
            "call",
            1,
            "call.reported",
            Utc::now(),
            json!({"Reported": {"reporter": reporter}}),
        );

        let notice = LifecycleNotice::from_envelope(&envelope);
        assert_eq!(notice.actor_id, Some(reporter));
    }
}
