use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use uuid::Uuid;

use fixdesk_auth::Role;
use fixdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use fixdesk_events::Event;
use fixdesk_tickets::{Attachment, CallId};

/// Work order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub AggregateId);

impl WorkOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Work order number, `WO-<year>-<sequence>` zero-padded to 4.
///
/// The sequence resets per calendar year and is allocated by the
/// infrastructure sequence allocator as `max(existing) + 1`; allocation is
/// serialized per scope so concurrent creators never share a number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkOrderNumber {
    pub year: i32,
    pub sequence: u32,
}

impl WorkOrderNumber {
    pub fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }
}

impl core::fmt::Display for WorkOrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "WO-{}-{:04}", self.year, self.sequence)
    }
}

impl FromStr for WorkOrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (prefix, year, seq) = (parts.next(), parts.next(), parts.next());
        match (prefix, year, seq) {
            (Some("WO"), Some(year), Some(seq)) => {
                let year = year
                    .parse::<i32>()
                    .map_err(|e| DomainError::invalid_id(format!("work order year: {e}")))?;
                let sequence = seq
                    .parse::<u32>()
                    .map_err(|e| DomainError::invalid_id(format!("work order sequence: {e}")))?;
                Ok(Self { year, sequence })
            }
            _ => Err(DomainError::invalid_id(format!(
                "malformed work order number '{s}'"
            ))),
        }
    }
}

/// Work order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[default]
    Pending,
    Approved,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn can_transition(self, to: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        matches!(
            (self, to),
            (Pending, Approved)
                | (Approved, InProgress)
                | (InProgress, Completed)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }
}

impl core::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            WorkOrderStatus::Pending => "pending",
            WorkOrderStatus::Approved => "approved",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Aggregate root: WorkOrder.
///
/// Approval belongs to managers; execution belongs to the assignee. Costs
/// are minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrder {
    id: WorkOrderId,
    number: Option<WorkOrderNumber>,
    call_id: Option<CallId>,
    title: String,
    description: String,
    assignee: Option<UserId>,
    approver: Option<UserId>,
    approved_at: Option<DateTime<Utc>>,
    planned_start: Option<DateTime<Utc>>,
    planned_end: Option<DateTime<Utc>>,
    actual_start: Option<DateTime<Utc>>,
    actual_end: Option<DateTime<Utc>>,
    materials: String,
    tools: String,
    safety_notes: String,
    estimated_cost: u64,
    actual_cost: Option<u64>,
    completion_notes: Option<String>,
    attachments: Vec<Attachment>,
    status: WorkOrderStatus,
    version: u64,
    created: bool,
}

impl WorkOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: WorkOrderId) -> Self {
        Self {
            id,
            number: None,
            call_id: None,
            title: String::new(),
            description: String::new(),
            assignee: None,
            approver: None,
            approved_at: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            materials: String::new(),
            tools: String::new(),
            safety_notes: String::new(),
            estimated_cost: 0,
            actual_cost: None,
            completion_notes: None,
            attachments: Vec::new(),
            status: WorkOrderStatus::Pending,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> WorkOrderId {
        self.id
    }

    pub fn number(&self) -> Option<WorkOrderNumber> {
        self.number
    }

    pub fn call_id(&self) -> Option<CallId> {
        self.call_id
    }

    pub fn assignee(&self) -> Option<UserId> {
        self.assignee
    }

    pub fn approver(&self) -> Option<UserId> {
        self.approver
    }

    pub fn status(&self) -> WorkOrderStatus {
        self.status
    }

    pub fn actual_start(&self) -> Option<DateTime<Utc>> {
        self.actual_start
    }

    pub fn actual_end(&self) -> Option<DateTime<Utc>> {
        self.actual_end
    }

    pub fn estimated_cost(&self) -> u64 {
        self.estimated_cost
    }

    pub fn actual_cost(&self) -> Option<u64> {
        self.actual_cost
    }

    pub fn completion_notes(&self) -> Option<&str> {
        self.completion_notes.as_deref()
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

    fn ensure_reachable(&self, to: WorkOrderStatus) -> Result<(), DomainError> {
        if self.status.can_transition(to) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(
                self.status.to_string(),
                to.to_string(),
            ))
        }
    }

    fn ensure_assignee(&self, actor_id: UserId) -> Result<(), DomainError> {
        if self.assignee != Some(actor_id) {
            return Err(DomainError::forbidden(
                "only the assignee may work this order",
            ));
        }
        Ok(())
    }
}

impl AggregateRoot for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWorkOrder {
    pub work_order_id: WorkOrderId,
    pub number: WorkOrderNumber,
    pub call_id: CallId,
    pub title: String,
    pub description: String,
    pub assignee: UserId,
    pub assignee_role: Role,
    pub assignee_active: bool,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub materials: String,
    pub tools: String,
    pub safety_notes: String,
    pub estimated_cost: u64,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveWorkOrder {
    pub work_order_id: WorkOrderId,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkOrder {
    pub work_order_id: WorkOrderId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteWorkOrder {
    pub work_order_id: WorkOrderId,
    pub completion_notes: String,
    pub actual_cost: Option<u64>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelWorkOrder {
    pub work_order_id: WorkOrderId,
    pub reason: String,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachToWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachToWorkOrder {
    pub work_order_id: WorkOrderId,
    pub attachment_id: Uuid,
    pub uploader: UserId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderCommand {
    Open(OpenWorkOrder),
    Approve(ApproveWorkOrder),
    Start(StartWorkOrder),
    Complete(CompleteWorkOrder),
    Cancel(CancelWorkOrder),
    Attach(AttachToWorkOrder),
}

/// Event: WorkOrderOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderOpened {
    pub work_order_id: WorkOrderId,
    pub number: WorkOrderNumber,
    pub call_id: CallId,
    pub title: String,
    pub description: String,
    pub assignee: UserId,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub materials: String,
    pub tools: String,
    pub safety_notes: String,
    pub estimated_cost: u64,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkOrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderApproved {
    pub work_order_id: WorkOrderId,
    pub approver: UserId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkOrderStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderStarted {
    pub work_order_id: WorkOrderId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkOrderCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderCompleted {
    pub work_order_id: WorkOrderId,
    pub completion_notes: String,
    pub actual_cost: Option<u64>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkOrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderCancelled {
    pub work_order_id: WorkOrderId,
    pub reason: String,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkOrderAttachmentAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderAttachmentAdded {
    pub work_order_id: WorkOrderId,
    pub attachment_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderEvent {
    Opened(WorkOrderOpened),
    Approved(WorkOrderApproved),
    Started(WorkOrderStarted),
    Completed(WorkOrderCompleted),
    Cancelled(WorkOrderCancelled),
    AttachmentAdded(WorkOrderAttachmentAdded),
}

impl Event for WorkOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkOrderEvent::Opened(_) => "workorder.opened",
            WorkOrderEvent::Approved(_) => "workorder.approved",
            WorkOrderEvent::Started(_) => "workorder.started",
            WorkOrderEvent::Completed(_) => "workorder.completed",
            WorkOrderEvent::Cancelled(_) => "workorder.cancelled",
            WorkOrderEvent::AttachmentAdded(_) => "workorder.attachment_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WorkOrderEvent::Opened(e) => e.occurred_at,
            WorkOrderEvent::Approved(e) => e.occurred_at,
            WorkOrderEvent::Started(e) => e.occurred_at,
            WorkOrderEvent::Completed(e) => e.occurred_at,
            WorkOrderEvent::Cancelled(e) => e.occurred_at,
            WorkOrderEvent::AttachmentAdded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for WorkOrder {
    type Command = WorkOrderCommand;
    type Event = WorkOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WorkOrderEvent::Opened(e) => {
                self.id = e.work_order_id;
                self.number = Some(e.number);
                self.call_id = Some(e.call_id);
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.assignee = Some(e.assignee);
                self.planned_start = e.planned_start;
                self.planned_end = e.planned_end;
                self.materials = e.materials.clone();
                self.tools = e.tools.clone();
                self.safety_notes = e.safety_notes.clone();
                self.estimated_cost = e.estimated_cost;
                self.status = WorkOrderStatus::Pending;
                self.created = true;
            }
            WorkOrderEvent::Approved(e) => {
                self.approver = Some(e.approver);
                self.approved_at = Some(e.occurred_at);
                self.status = WorkOrderStatus::Approved;
            }
            WorkOrderEvent::Started(e) => {
                if self.actual_start.is_none() {
                    self.actual_start = Some(e.occurred_at);
                }
                self.status = WorkOrderStatus::InProgress;
            }
            WorkOrderEvent::Completed(e) => {
                if self.actual_start.is_none() {
                    self.actual_start = Some(e.occurred_at);
                }
                self.actual_end = Some(e.occurred_at);
                self.actual_cost = e.actual_cost;
                self.completion_notes = Some(e.completion_notes.clone());
                self.status = WorkOrderStatus::Completed;
            }
            WorkOrderEvent::Cancelled(_) => {
                self.status = WorkOrderStatus::Cancelled;
            }
            WorkOrderEvent::AttachmentAdded(e) => {
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
            WorkOrderCommand::Open(cmd) => self.handle_open(cmd),
            WorkOrderCommand::Approve(cmd) => self.handle_approve(cmd),
            WorkOrderCommand::Start(cmd) => self.handle_start(cmd),
            WorkOrderCommand::Complete(cmd) => self.handle_complete(cmd),
            WorkOrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
            WorkOrderCommand::Attach(cmd) => self.handle_attach(cmd),
        }
    }
}

impl WorkOrder {
    fn handle_open(&self, cmd: &OpenWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("work order already exists"));
        }
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("work order title cannot be empty"));
        }
        if cmd.actor_role < Role::Manager {
            return Err(DomainError::forbidden(
                "only managers may create work orders",
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
        if let (Some(start), Some(end)) = (cmd.planned_start, cmd.planned_end) {
            if end < start {
                return Err(DomainError::validation(
                    "planned end cannot precede planned start",
                ));
            }
        }

        Ok(vec![WorkOrderEvent::Opened(WorkOrderOpened {
            work_order_id: cmd.work_order_id,
            number: cmd.number,
            call_id: cmd.call_id,
            title: cmd.title.trim().to_string(),
            description: cmd.description.clone(),
            assignee: cmd.assignee,
            planned_start: cmd.planned_start,
            planned_end: cmd.planned_end,
            materials: cmd.materials.clone(),
            tools: cmd.tools.clone(),
            safety_notes: cmd.safety_notes.clone(),
            estimated_cost: cmd.estimated_cost,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(WorkOrderStatus::Approved)?;

        if cmd.actor_role < Role::Manager {
            return Err(DomainError::forbidden(
                "only managers may approve work orders",
            ));
        }

        Ok(vec![WorkOrderEvent::Approved(WorkOrderApproved {
            work_order_id: cmd.work_order_id,
            approver: cmd.actor_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(WorkOrderStatus::InProgress)?;
        self.ensure_assignee(cmd.actor_id)?;

        Ok(vec![WorkOrderEvent::Started(WorkOrderStarted {
            work_order_id: cmd.work_order_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(WorkOrderStatus::Completed)?;
        self.ensure_assignee(cmd.actor_id)?;

        if cmd.completion_notes.trim().is_empty() {
            return Err(DomainError::validation(
                "completion requires non-empty notes",
            ));
        }

        Ok(vec![WorkOrderEvent::Completed(WorkOrderCompleted {
            work_order_id: cmd.work_order_id,
            completion_notes: cmd.completion_notes.trim().to_string(),
            actual_cost: cmd.actual_cost,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_reachable(WorkOrderStatus::Cancelled)?;

        if cmd.actor_role < Role::Manager {
            return Err(DomainError::forbidden(
                "only managers may cancel work orders",
            ));
        }

        Ok(vec![WorkOrderEvent::Cancelled(WorkOrderCancelled {
            work_order_id: cmd.work_order_id,
            reason: cmd.reason.clone(),
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach(&self, cmd: &AttachToWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_created()?;
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "cannot add to a work order once it is {}",
                self.status
            )));
        }
        if cmd.file_name.trim().is_empty() {
            return Err(DomainError::validation("attachment needs a file name"));
        }

        Ok(vec![WorkOrderEvent::AttachmentAdded(
            WorkOrderAttachmentAdded {
                work_order_id: cmd.work_order_id,
                attachment_id: cmd.attachment_id,
                file_name: cmd.file_name.clone(),
                content_type: cmd.content_type.clone(),
                size_bytes: cmd.size_bytes,
                actor_id: cmd.uploader,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
