//! Typed request payloads for the application service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixdesk_core::{DepartmentId, UserId};
use fixdesk_tickets::{CallId, Priority};

/// Payload for reporting a new maintenance call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCall {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub department_id: DepartmentId,
}

/// Payload for opening a work order against an existing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub call_id: CallId,
    pub title: String,
    pub description: String,
    pub assignee: UserId,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub materials: String,
    pub tools: String,
    pub safety_notes: String,
    /// Minor currency units.
    pub estimated_cost: u64,
}

/// What a successful command returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub entity_id: fixdesk_core::AggregateId,
    /// Human-facing reference number, where the entity carries one.
    pub reference: Option<String>,
    pub new_state: String,
}
