use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fixdesk_auth::Role;
use fixdesk_core::{
    Aggregate, AggregateId, AggregateRoot, DepartmentId, DomainError, Entity, UserId,
};
use fixdesk_events::Event;

/// Maintenance call identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub AggregateId);

impl CallId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CallId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Human-facing call number, `MC-<year>-<sequence>` zero-padded to 4.
///
/// Sequence scope is the calendar year; allocation lives behind the
/// infrastructure sequence allocator, never in the aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallNumber {
    pub year: i32,
    pub sequence: u32,
}

impl CallNumber {
    pub fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }
}

impl core::fmt::Display for CallNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "MC-{}-{:04}", self.year, self.sequence)
    }
}

/// Call priority, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Maintenance call status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Open,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Cancelled,
}

impl CallStatus {
    /// Single source of truth for reachable transitions; everything else is
    /// an `InvalidTransition`, evaluated before any actor rule.
    pub fn can_transition(self, to: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, to),
            (Open, Assigned)
                | (Open, InProgress)
                | (Assigned, InProgress)
                | (InProgress, Resolved)
                | (Resolved, Closed)
                | (Open, Cancelled)
                | (Assigned, Cancelled)
                | (InProgress, Cancelled)
                | (Resolved, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Closed | CallStatus::Cancelled)
    }
}

impl core::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            CallStatus::Open => "open",
            CallStatus::Assigned => "assigned",
            CallStatus::InProgress => "in_progress",
            CallStatus::Resolved => "resolved",
            CallStatus::Closed => "closed",
            CallStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A comment on a call. Immutable once created; append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: Uuid,
    pub author: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Comment {
    type Id = Uuid;

    fn id(&self) -> &Self::Id {
        &self.comment_id
    }
}

/// File metadata attached to a call. Append-only; bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: Uuid,
    pub uploader: UserId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl Entity for Attachment {
    type Id = Uuid;

    fn id(&self) -> &Self::Id {
        &self.attachment_id
    }
}

/// Aggregate root: MaintenanceCall.
///
/// The reporter owns read access; the assignee owns work-state mutation.
/// Role-level permission is the guard's job; this aggregate re-validates the
/// per-transition actor rules against its *current* state so that a stale
/// pre-check can never smuggle in an illegal write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceCall {
    id: CallId,
    number: Option<CallNumber>,
    title: String,
    description: String,
    priority: Priority,
    reporter: Option<UserId>,
    assignee: Option<UserId>,
    department_id: Option<DepartmentId>,
    status: CallStatus,
    reported_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    version: u64,
    created: bool,
}

impl MaintenanceCall {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CallId) -> Self {
        Self {
            id,
            number: None,
            title: String::new(),
            description: String::new(),
            priority: Priority::default(),
            reporter: None,
            assignee: None,
            department_id: None,
            status: CallStatus::Open,
            reported_at: None,
            resolved_at: None,
            comments: Vec::new(),
            attachments: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CallId {
        self.id
    }

    pub fn number(&self) -> Option<CallNumber> {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn reporter(&self) -> Option<UserId> {
        self.reporter
    }

    pub fn assignee(&self) -> Option<UserId> {
        self.assignee
    }

    pub fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_reachable(&self, to: CallStatus) -> Result<(), DomainError> {
        if self.status.can_transition(to) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(
                self.status.to_string(),
                to.to_string(),
            ))
        }
    }

    fn ensure_not_terminal_for_append(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "cannot add to a call once it is {}",
                self.status
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for MaintenanceCall {
    type Id = CallId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReportCall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCall {
    pub call_id: CallId,
    pub number: CallNumber,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub reporter: UserId,
    pub department_id: DepartmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignCall (manager assigning, or technician accepting).
///
/// Carries a snapshot of the intended assignee so the engine can enforce the
/// role/active invariants without IO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCall {
    pub call_id: CallId,
    pub assignee: UserId,
    pub assignee_role: Role,
    pub assignee_active: bool,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartWork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWork {
    pub call_id: CallId,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveCall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveCall {
    pub call_id: CallId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseCall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseCall {
    pub call_id: CallId,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelCall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelCall {
    pub call_id: CallId,
    pub reason: String,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddComment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddComment {
    pub call_id: CallId,
    pub comment_id: Uuid,
    pub author: UserId,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddAttachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAttachment {
    pub call_id: CallId,
    pub attachment_id: Uuid,
    pub uploader: UserId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallCommand {
    Report(ReportCall),
    Assign(AssignCall),
    StartWork(StartWork),
    Resolve(ResolveCall),
    Close(CloseCall),
    Cancel(CancelCall),
    AddComment(AddComment),
    AddAttachment(AddAttachment),
}

/// Event: CallReported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReported {
    pub call_id: CallId,
    pub number: CallNumber,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub department_id: DepartmentId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CallAssigned.
///
/// Also covers reassignment: `previous_assignee` is `Some` and the status
/// field of the aggregate is left untouched when work is already underway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAssigned {
    pub call_id: CallId,
    pub assignee: UserId,
    pub previous_assignee: Option<UserId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStarted {
    pub call_id: CallId,
    /// The assignee after this event; from `open` a technician self-assigns.
    pub assignee: UserId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CallResolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResolved {
    pub call_id: CallId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CallClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallClosed {
    pub call_id: CallId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CallCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCancelled {
    pub call_id: CallId,
    pub reason: String,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CommentAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAdded {
    pub call_id: CallId,
    pub comment_id: Uuid,
    pub body: String,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AttachmentAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentAdded {
    pub call_id: CallId,
    pub attachment_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallEvent {
    Reported(CallReported),
    Assigned(CallAssigned),
    WorkStarted(WorkStarted),
    Resolved(CallResolved),
    Closed(CallClosed),
    Cancelled(CallCancelled),
    CommentAdded(CommentAdded),
    AttachmentAdded(AttachmentAdded),
}

impl Event for CallEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CallEvent::Reported(_) => "call.reported",
            CallEvent::Assigned(_) => "call.assigned",
            CallEvent::WorkStarted(_) => "call.work_started",
            CallEvent::Resolved(_) => "call.resolved",
            CallEvent::Closed(_) => "call.closed",
            CallEvent::Cancelled(_) => "call.cancelled",
            CallEvent::CommentAdded(_) => "call.comment_added",
            CallEvent::AttachmentAdded(_) => "call.attachment_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CallEvent::Reported(e) => e.occurred_at,
            CallEvent::Assigned(e) => e.occurred_at,
            CallEvent::WorkStarted(e) => e.occurred_at,
            CallEvent::Resolved(e) => e.occurred_at,
            CallEvent::Closed(e) => e.occurred_at,
            CallEvent::Cancelled(e) => e.occurred_at,
            CallEvent::CommentAdded(e) => e.occurred_at,
            CallEvent::AttachmentAdded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MaintenanceCall {
    type Command = CallCommand;
    type Event = CallEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CallEvent::Reported(e) => {
                self.id = e.call_id;
                self.number = Some(e.number);
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.priority = e.priority;
                self.reporter = Some(e.actor_id);
                self.department_id = Some(e.department_id);
                self.status = CallStatus::Open;
                self.reported_at = Some(e.occurred_at);
                self.created = true;
            }
            CallEvent::Assigned(e) => {
                self.assignee = Some(e.assignee);
                // Reassignment mid-flight keeps the current status.
                if self.status == CallStatus::Open {
                    self.status = CallStatus::Assigned;
                }
            }
            CallEvent::WorkStarted(e) => {
                self.assignee = Some(e.assignee);
                self.status = CallStatus::InProgress;
            }
            CallEvent::Resolved(e) => {
                self.resolved_at = Some(e.occurred_at);
                self.status = CallStatus::Resolved;
            }
            CallEvent::Closed(_) => {
                self.status = CallStatus::Closed;
            }
            CallEvent::Cancelled(_) => {
                self.status = CallStatus::Cancelled;
            }
            CallEvent::CommentAdded(e) => {
                self.comments.push(Comment {
                    comment_id: e.comment_id,
                    author: e.actor_id,
                    body: e.body.clone(),
                    created_at: e.occurred_at,
                });
            }
            CallEvent::AttachmentAdded(e) => {
                self.attachments.push(Attachment {
                    attachment_id: e.attachment_id,
                    uploader: e.actor_id,
                    file_name: e.file_name.clone(),
                    content_type: e.content_type.clone(),
                    size_bytes: e.size_bytes,
                    created_at: e.occurred_at,
                });
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CallCommand::Report(cmd) => self.handle_report(cmd),
            CallCommand::Assign(cmd) => self.handle_assign(cmd),
            CallCommand::StartWork(cmd) => self.handle_start_work(cmd),
            CallCommand::Resolve(cmd) => self.handle_resolve(cmd),
            CallCommand::Close(cmd) => self.handle_close(cmd),
            CallCommand::Cancel(cmd) => self.handle_cancel(cmd),
            CallCommand::AddComment(cmd) => self.handle_add_comment(cmd),
            CallCommand::AddAttachment(cmd) => self.handle_add_attachment(cmd),
        }
    }
}

impl MaintenanceCall {
    fn handle_report(&self, cmd: &ReportCall) -> Result<Vec<CallEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("call already exists"));
        }
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("call title cannot be empty"));
        }

        Ok(vec![CallEvent::Reported(CallReported {
            call_id: cmd.call_id,
            number: cmd.number,
            title: cmd.title.trim().to_string(),
            description: cmd.description.clone(),
            priority: cmd.priority,
            department_id: cmd.department_id,
            actor_id: cmd.reporter,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignCall) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;

        // Reassignment of an already-assigned or in-progress call is allowed
        // and does not move the status; a fresh assignment must be reachable.
        if self.assignee.is_none() {
            self.ensure_reachable(CallStatus::Assigned)?;
        } else if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(
                self.status.to_string(),
                CallStatus::Assigned.to_string(),
            ));
        }

        if !cmd.assignee_role.can_be_assignee() {
            return Err(DomainError::invariant(
                "assignee must be a technician or manager",
            ));
        }
        if !cmd.assignee_active {
            return Err(DomainError::invariant("cannot assign an inactive user"));
        }

        let self_accepting = cmd.actor_role == Role::Technician
            && cmd.assignee == cmd.actor_id
            && self.status == CallStatus::Open;
        if cmd.actor_role < Role::Manager && !self_accepting {
            return Err(DomainError::forbidden(
                "only managers may assign calls; technicians may only accept an open call themselves",
            ));
        }

        Ok(vec![CallEvent::Assigned(CallAssigned {
            call_id: cmd.call_id,
            assignee: cmd.assignee,
            previous_assignee: self.assignee,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start_work(&self, cmd: &StartWork) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(CallStatus::InProgress)?;

        let assignee = match self.assignee {
            Some(current) => {
                if current != cmd.actor_id {
                    return Err(DomainError::forbidden(
                        "only the current assignee may start work",
                    ));
                }
                current
            }
            // From `open` with no assignee: a technician accepting and
            // starting in one step takes the assignment implicitly.
            None => {
                if !cmd.actor_role.can_be_assignee() {
                    return Err(DomainError::forbidden(
                        "only a technician may start work on an unassigned call",
                    ));
                }
                cmd.actor_id
            }
        };

        Ok(vec![CallEvent::WorkStarted(WorkStarted {
            call_id: cmd.call_id,
            assignee,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve(&self, cmd: &ResolveCall) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(CallStatus::Resolved)?;

        if self.assignee != Some(cmd.actor_id) {
            return Err(DomainError::forbidden(
                "only the current assignee may resolve a call",
            ));
        }

        Ok(vec![CallEvent::Resolved(CallResolved {
            call_id: cmd.call_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseCall) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(CallStatus::Closed)?;

        if cmd.actor_role < Role::Manager {
            return Err(DomainError::forbidden("only managers may close calls"));
        }

        Ok(vec![CallEvent::Closed(CallClosed {
            call_id: cmd.call_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelCall) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(CallStatus::Cancelled)?;

        if cmd.actor_role < Role::Manager {
            return Err(DomainError::forbidden("only managers may cancel calls"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("cancellation requires a reason"));
        }

        Ok(vec![CallEvent::Cancelled(CallCancelled {
            call_id: cmd.call_id,
            reason: cmd.reason.trim().to_string(),
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_comment(&self, cmd: &AddComment) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_not_terminal_for_append()?;

        if cmd.body.trim().is_empty() {
            return Err(DomainError::validation("comment cannot be empty"));
        }

        Ok(vec![CallEvent::CommentAdded(CommentAdded {
            call_id: cmd.call_id,
            comment_id: cmd.comment_id,
            body: cmd.body.clone(),
            actor_id: cmd.author,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_attachment(&self, cmd: &AddAttachment) -> Result<Vec<CallEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_not_terminal_for_append()?;

        if cmd.file_name.trim().is_empty() {
            return Err(DomainError::validation("attachment needs a file name"));
        }

        Ok(vec![CallEvent::AttachmentAdded(AttachmentAdded {
            call_id: cmd.call_id,
            attachment_id: cmd.attachment_id,
            file_name: cmd.file_name.clone(),
            content_type: cmd.content_type.clone(),
            size_bytes: cmd.size_bytes,
            actor_id: cmd.uploader,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn call_id() -> CallId {
        CallId::new(AggregateId::new())
    }

    fn reported_call(id: CallId, reporter: UserId) -> MaintenanceCall {
        let mut call = MaintenanceCall::empty(id);
        let events = call
            .handle(&CallCommand::Report(ReportCall {
                call_id: id,
                number: CallNumber::new(2024, 1),
                title: "Broken radiator in room 204".to_string(),
                description: "No heat since Monday".to_string(),
                priority: Priority::High,
                reporter,
                department_id: DepartmentId::new(),
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            call.apply(e);
        }
        call
    }

    fn assign(call: &mut MaintenanceCall, assignee: UserId, actor: UserId, actor_role: Role) {
        let events = call
            .handle(&CallCommand::Assign(AssignCall {
                call_id: call.id_typed(),
                assignee,
                assignee_role: Role::Technician,
                assignee_active: true,
                actor_id: actor,
                actor_role,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            call.apply(e);
        }
    }

    fn start(call: &mut MaintenanceCall, actor: UserId) {
        let events = call
            .handle(&CallCommand::StartWork(StartWork {
                call_id: call.id_typed(),
                actor_id: actor,
                actor_role: Role::Technician,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            call.apply(e);
        }
    }

    #[test]
    fn call_number_formats_zero_padded() {
        assert_eq!(CallNumber::new(2024, 8).to_string(), "MC-2024-0008");
        assert_eq!(CallNumber::new(2025, 12345).to_string(), "MC-2025-12345");
    }

    #[test]
    fn full_lifecycle_open_to_closed() {
        let id = call_id();
        let reporter = UserId::new();
        let manager = UserId::new();
        let tech = UserId::new();

        let mut call = reported_call(id, reporter);
        assert_eq!(call.status(), CallStatus::Open);
        assert_eq!(call.reporter(), Some(reporter));

        assign(&mut call, tech, manager, Role::Manager);
        assert_eq!(call.status(), CallStatus::Assigned);
        assert_eq!(call.assignee(), Some(tech));

        start(&mut call, tech);
        assert_eq!(call.status(), CallStatus::InProgress);

        let events = call
            .handle(&CallCommand::Resolve(ResolveCall {
                call_id: id,
                actor_id: tech,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            call.apply(e);
        }
        assert_eq!(call.status(), CallStatus::Resolved);
        assert!(call.resolved_at().is_some());

        let events = call
            .handle(&CallCommand::Close(CloseCall {
                call_id: id,
                actor_id: manager,
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            call.apply(e);
        }
        assert_eq!(call.status(), CallStatus::Closed);

        // Reporter can no longer comment.
        let err = call
            .handle(&CallCommand::AddComment(AddComment {
                call_id: id,
                comment_id: Uuid::now_v7(),
                author: reporter,
                body: "thanks!".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn invalid_transition_leaves_state_unchanged() {
        let id = call_id();
        let call = reported_call(id, UserId::new());
        let before = call.clone();

        let err = call
            .handle(&CallCommand::Close(CloseCall {
                call_id: id,
                actor_id: UserId::new(),
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::invalid_transition("open", "closed")
        );
        assert_eq!(call, before);
    }

    #[test]
    fn technician_may_accept_open_call_but_not_assign_others() {
        let id = call_id();
        let call = reported_call(id, UserId::new());
        let tech = UserId::new();
        let other_tech = UserId::new();

        // Self-accept works.
        let events = call
            .handle(&CallCommand::Assign(AssignCall {
                call_id: id,
                assignee: tech,
                assignee_role: Role::Technician,
                assignee_active: true,
                actor_id: tech,
                actor_role: Role::Technician,
                occurred_at: now(),
            }))
            .unwrap();
        assert!(matches!(events[0], CallEvent::Assigned(_)));

        // Handing the call to a colleague does not.
        let err = call
            .handle(&CallCommand::Assign(AssignCall {
                call_id: id,
                assignee: other_tech,
                assignee_role: Role::Technician,
                assignee_active: true,
                actor_id: tech,
                actor_role: Role::Technician,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn assignee_must_be_active_technician_or_manager() {
        let id = call_id();
        let call = reported_call(id, UserId::new());
        let manager = UserId::new();

        let err = call
            .handle(&CallCommand::Assign(AssignCall {
                call_id: id,
                assignee: UserId::new(),
                assignee_role: Role::User,
                assignee_active: true,
                actor_id: manager,
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = call
            .handle(&CallCommand::Assign(AssignCall {
                call_id: id,
                assignee: UserId::new(),
                assignee_role: Role::Technician,
                assignee_active: false,
                actor_id: manager,
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn non_assignee_technician_cannot_resolve() {
        let id = call_id();
        let manager = UserId::new();
        let tech = UserId::new();
        let intruder = UserId::new();

        let mut call = reported_call(id, UserId::new());
        assign(&mut call, tech, manager, Role::Manager);
        start(&mut call, tech);

        let err = call
            .handle(&CallCommand::Resolve(ResolveCall {
                call_id: id,
                actor_id: intruder,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(call.status(), CallStatus::InProgress);
    }

    #[test]
    fn reassignment_in_progress_keeps_status() {
        let id = call_id();
        let manager = UserId::new();
        let tech = UserId::new();
        let replacement = UserId::new();

        let mut call = reported_call(id, UserId::new());
        assign(&mut call, tech, manager, Role::Manager);
        start(&mut call, tech);
        assert_eq!(call.status(), CallStatus::InProgress);

        assign(&mut call, replacement, manager, Role::Manager);
        assert_eq!(call.status(), CallStatus::InProgress);
        assert_eq!(call.assignee(), Some(replacement));

        // The new assignee owns further transitions.
        let err = call
            .handle(&CallCommand::Resolve(ResolveCall {
                call_id: id,
                actor_id: tech,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let events = call
            .handle(&CallCommand::Resolve(ResolveCall {
                call_id: id,
                actor_id: replacement,
                occurred_at: now(),
            }))
            .unwrap();
        assert!(matches!(events[0], CallEvent::Resolved(_)));
    }

    #[test]
    fn technician_starting_open_call_takes_the_assignment() {
        let id = call_id();
        let tech = UserId::new();
        let mut call = reported_call(id, UserId::new());

        start(&mut call, tech);
        assert_eq!(call.status(), CallStatus::InProgress);
        assert_eq!(call.assignee(), Some(tech));
    }

    #[test]
    fn cancel_requires_manager_and_reason_and_a_live_call() {
        let id = call_id();
        let manager = UserId::new();
        let mut call = reported_call(id, UserId::new());

        let err = call
            .handle(&CallCommand::Cancel(CancelCall {
                call_id: id,
                reason: "duplicate of MC-2024-0003".to_string(),
                actor_id: UserId::new(),
                actor_role: Role::Technician,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = call
            .handle(&CallCommand::Cancel(CancelCall {
                call_id: id,
                reason: "  ".to_string(),
                actor_id: manager,
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let events = call
            .handle(&CallCommand::Cancel(CancelCall {
                call_id: id,
                reason: "duplicate of MC-2024-0003".to_string(),
                actor_id: manager,
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            call.apply(e);
        }
        assert_eq!(call.status(), CallStatus::Cancelled);

        // Terminal: no further cancel, comment or attachment.
        assert!(call
            .handle(&CallCommand::Cancel(CancelCall {
                call_id: id,
                reason: "again".to_string(),
                actor_id: manager,
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .is_err());
        assert!(call
            .handle(&CallCommand::AddAttachment(AddAttachment {
                call_id: id,
                attachment_id: Uuid::now_v7(),
                uploader: manager,
                file_name: "photo.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                size_bytes: 1024,
                occurred_at: now(),
            }))
            .is_err());
    }

    #[test]
    fn comments_accumulate_in_order() {
        let id = call_id();
        let reporter = UserId::new();
        let mut call = reported_call(id, reporter);

        for body in ["first", "second"] {
            let events = call
                .handle(&CallCommand::AddComment(AddComment {
                    call_id: id,
                    comment_id: Uuid::now_v7(),
                    author: reporter,
                    body: body.to_string(),
                    occurred_at: now(),
                }))
                .unwrap();
            for e in &events {
                call.apply(e);
            }
        }

        assert_eq!(call.comments().len(), 2);
        assert_eq!(call.comments()[0].body, "first");
        assert_eq!(call.comments()[1].body, "second");
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let id = call_id();
        let call = reported_call(id, UserId::new());
        let before = call.clone();
        let tech = UserId::new();

        let cmd = CallCommand::Assign(AssignCall {
            call_id: id,
            assignee: tech,
            assignee_role: Role::Technician,
            assignee_active: true,
            actor_id: tech,
            actor_role: Role::Technician,
            occurred_at: now(),
        });

        let events1 = call.handle(&cmd).unwrap();
        let events2 = call.handle(&cmd).unwrap();

        assert_eq!(call, before);
        assert_eq!(events1, events2);
    }
}
