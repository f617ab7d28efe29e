//! Application service: the single entry point for every operation.
//!
//! Each operation runs the same pipeline: resolve the acting user, rehydrate
//! the target to build an authorization context, consult the capability
//! table, then dispatch a command carrying fresh snapshots of any referenced
//! users. Role and ownership checks therefore always run against current
//! state, and a concurrent change between load and append is caught by the
//! optimistic append and surfaces as a conflict.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use fixdesk_auth::user::{
    AssignDepartment, ChangeRole, CreateUser, DeactivateUser, ProvisionUser, ReactivateUser,
};
use fixdesk_auth::{
    Action, Actor, Role, TargetContext, User, UserCommand, UserDirectory, UserRecord, UserStatus,
    authorize,
};
use fixdesk_core::{AggregateId, AggregateRoot, DepartmentId, UserId};
use fixdesk_directory::department::{
    AssignManager, CreateDepartment, DeactivateDepartment, ReactivateDepartment,
};
use fixdesk_directory::{Department, DepartmentCommand};
use fixdesk_events::{EventBus, EventEnvelope, InMemoryEventBus};
use fixdesk_infra::{
    CommandDispatcher, DispatchError, EventStore, InMemoryDirectory, InMemoryEventStore,
    InMemorySequenceAllocator, LifecycleNotice, LogNotifier, Notifier, SequenceAllocator,
    StoredEvent,
};
use fixdesk_tickets::call::{
    AddAttachment, AddComment, AssignCall, CallNumber, CancelCall, CloseCall, ReportCall,
    ResolveCall, StartWork,
};
use fixdesk_tickets::{CallCommand, CallId, MaintenanceCall};
use fixdesk_workorders::workorder::{
    ApproveWorkOrder, AttachToWorkOrder, CancelWorkOrder, CompleteWorkOrder, OpenWorkOrder,
    StartWorkOrder,
};
use fixdesk_workorders::{WorkOrder, WorkOrderCommand, WorkOrderId, WorkOrderNumber};

use crate::error::ServiceError;
use crate::request::{NewCall, NewWorkOrder, Outcome};

const CALL_AGGREGATE: &str = "call";
const WORKORDER_AGGREGATE: &str = "workorder";
const USER_AGGREGATE: &str = "user";
const DEPARTMENT_AGGREGATE: &str = "department";

/// Ticketing application service.
///
/// Generic over store and bus so tests run fully in memory and real backends
/// slot in unchanged.
pub struct TicketService<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    directory: Arc<dyn UserDirectory>,
    sequences: Arc<dyn SequenceAllocator>,
    notifier: Arc<dyn Notifier>,
}

/// Fully in-memory service wiring, used by tests and local development.
pub type InMemoryTicketService =
    TicketService<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

impl InMemoryTicketService {
    pub fn in_memory() -> (Self, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>) {
        let store = Arc::new(InMemoryEventStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let service = TicketService::new(
            store,
            Arc::clone(&bus),
            Arc::new(InMemoryDirectory::new()),
            Arc::new(InMemorySequenceAllocator::new()),
            Arc::new(LogNotifier::new()),
        );
        (service, bus)
    }
}

impl<S, B> TicketService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        store: S,
        bus: B,
        directory: Arc<dyn UserDirectory>,
        sequences: Arc<dyn SequenceAllocator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            directory,
            sequences,
            notifier,
        }
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Resolve a trusted principal to a user record, provisioning on first
    /// sight with the default `user` role.
    pub fn authenticate(
        &self,
        principal: &str,
        display_name: &str,
        email: &str,
    ) -> Result<UserRecord, ServiceError> {
        if let Some(existing) = self.directory.find_by_principal(principal) {
            return Ok(existing);
        }

        let record = fixdesk_auth::resolve_or_provision(
            self.directory.as_ref(),
            principal,
            display_name,
            email,
        );
        let cmd = UserCommand::Provision(ProvisionUser {
            user_id: record.user_id,
            principal: record.principal.clone(),
            display_name: record.display_name.clone(),
            email: record.email.clone(),
            occurred_at: Utc::now(),
        });
        let (_, committed) = self.dispatcher.dispatch(
            record.user_id.into(),
            USER_AGGREGATE,
            cmd,
            |id| User::empty(UserId::from(id)),
        )?;
        self.emit_notices(&committed);
        Ok(record)
    }

    // ---- maintenance calls ----

    pub fn report_call(&self, actor_id: UserId, req: NewCall) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ReportCall, None)?;

        let now = Utc::now();
        let sequence = self.sequences.next(&format!("call-{}", now.year()))?;
        let call_id = CallId::new(AggregateId::new());
        let cmd = CallCommand::Report(ReportCall {
            call_id,
            number: CallNumber::new(now.year(), sequence),
            title: req.title,
            description: req.description,
            priority: req.priority,
            reporter: actor_id,
            department_id: req.department_id,
            occurred_at: now,
        });
        self.dispatch_call(call_id, cmd)
    }

    /// Manager assigning (or reassigning) a call to a technician or manager.
    pub fn assign_call(
        &self,
        actor_id: UserId,
        call_id: CallId,
        assignee: UserId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::AssignCall, Some(&call_target(&call)))?;

        let snapshot = self.user_snapshot(assignee)?;
        let cmd = CallCommand::Assign(AssignCall {
            call_id,
            assignee,
            assignee_role: snapshot.role,
            assignee_active: snapshot.is_active(),
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    /// Technician accepting an open call for themselves.
    pub fn accept_call(&self, actor_id: UserId, call_id: CallId) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::AcceptCall, None)?;

        let cmd = CallCommand::Assign(AssignCall {
            call_id,
            assignee: actor_id,
            assignee_role: actor.role,
            assignee_active: actor.active,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    pub fn start_work(&self, actor_id: UserId, call_id: CallId) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        // Starting an unassigned open call doubles as accepting it.
        let action = if call.assignee().is_none() {
            Action::AcceptCall
        } else {
            Action::TransitionCall
        };
        let target = call_target(&call);
        self.check(&actor, action, (action != Action::AcceptCall).then_some(&target))?;

        let cmd = CallCommand::StartWork(StartWork {
            call_id,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    pub fn resolve_call(&self, actor_id: UserId, call_id: CallId) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::TransitionCall, Some(&call_target(&call)))?;

        let cmd = CallCommand::Resolve(ResolveCall {
            call_id,
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    pub fn close_call(&self, actor_id: UserId, call_id: CallId) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::TransitionCall, Some(&call_target(&call)))?;

        let cmd = CallCommand::Close(CloseCall {
            call_id,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    pub fn cancel_call(
        &self,
        actor_id: UserId,
        call_id: CallId,
        reason: impl Into<String>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::CancelCall, Some(&call_target(&call)))?;

        let cmd = CallCommand::Cancel(CancelCall {
            call_id,
            reason: reason.into(),
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    pub fn add_comment(
        &self,
        actor_id: UserId,
        call_id: CallId,
        body: impl Into<String>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::CommentOnCall, Some(&call_target(&call)))?;

        let cmd = CallCommand::AddComment(AddComment {
            call_id,
            comment_id: Uuid::now_v7(),
            author: actor_id,
            body: body.into(),
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    pub fn add_attachment(
        &self,
        actor_id: UserId,
        call_id: CallId,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: u64,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::CommentOnCall, Some(&call_target(&call)))?;

        let cmd = CallCommand::AddAttachment(AddAttachment {
            call_id,
            attachment_id: Uuid::now_v7(),
            uploader: actor_id,
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes,
            occurred_at: Utc::now(),
        });
        self.dispatch_call(call_id, cmd)
    }

    /// Rehydrate a call for display, subject to the view capability.
    pub fn view_call(
        &self,
        actor_id: UserId,
        call_id: CallId,
    ) -> Result<MaintenanceCall, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(call_id)?;
        self.check(&actor, Action::ViewCall, Some(&call_target(&call)))?;
        Ok(call)
    }

    // ---- work orders ----

    pub fn create_work_order(
        &self,
        actor_id: UserId,
        req: NewWorkOrder,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let call = self.load_call(req.call_id)?;
        self.check(&actor, Action::CreateWorkOrder, Some(&call_target(&call)))?;

        let snapshot = self.user_snapshot(req.assignee)?;
        let now = Utc::now();
        let sequence = self.sequences.next(&format!("workorder-{}", now.year()))?;
        let work_order_id = WorkOrderId::new(AggregateId::new());
        let cmd = WorkOrderCommand::Open(OpenWorkOrder {
            work_order_id,
            number: WorkOrderNumber::new(now.year(), sequence),
            call_id: req.call_id,
            title: req.title,
            description: req.description,
            assignee: req.assignee,
            assignee_role: snapshot.role,
            assignee_active: snapshot.is_active(),
            planned_start: req.planned_start,
            planned_end: req.planned_end,
            materials: req.materials,
            tools: req.tools,
            safety_notes: req.safety_notes,
            estimated_cost: req.estimated_cost,
            actor_id,
            actor_role: actor.role,
            occurred_at: now,
        });
        self.dispatch_work_order(work_order_id, cmd)
    }

    pub fn approve_work_order(
        &self,
        actor_id: UserId,
        work_order_id: WorkOrderId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let (_, target) = self.load_work_order(work_order_id)?;
        self.check(&actor, Action::ApproveWorkOrder, Some(&target))?;

        let cmd = WorkOrderCommand::Approve(ApproveWorkOrder {
            work_order_id,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_work_order(work_order_id, cmd)
    }

    pub fn start_work_order(
        &self,
        actor_id: UserId,
        work_order_id: WorkOrderId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let (_, target) = self.load_work_order(work_order_id)?;
        self.check(&actor, Action::TransitionWorkOrder, Some(&target))?;

        let cmd = WorkOrderCommand::Start(StartWorkOrder {
            work_order_id,
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_work_order(work_order_id, cmd)
    }

    pub fn complete_work_order(
        &self,
        actor_id: UserId,
        work_order_id: WorkOrderId,
        completion_notes: impl Into<String>,
        actual_cost: Option<u64>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let (_, target) = self.load_work_order(work_order_id)?;
        self.check(&actor, Action::TransitionWorkOrder, Some(&target))?;

        let cmd = WorkOrderCommand::Complete(CompleteWorkOrder {
            work_order_id,
            completion_notes: completion_notes.into(),
            actual_cost,
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_work_order(work_order_id, cmd)
    }

    pub fn attach_to_work_order(
        &self,
        actor_id: UserId,
        work_order_id: WorkOrderId,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: u64,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let (_, target) = self.load_work_order(work_order_id)?;
        self.check(&actor, Action::TransitionWorkOrder, Some(&target))?;

        let cmd = WorkOrderCommand::Attach(AttachToWorkOrder {
            work_order_id,
            attachment_id: Uuid::now_v7(),
            uploader: actor_id,
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes,
            occurred_at: Utc::now(),
        });
        self.dispatch_work_order(work_order_id, cmd)
    }

    pub fn cancel_work_order(
        &self,
        actor_id: UserId,
        work_order_id: WorkOrderId,
        reason: impl Into<String>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        let (_, target) = self.load_work_order(work_order_id)?;
        self.check(&actor, Action::CancelWorkOrder, Some(&target))?;

        let cmd = WorkOrderCommand::Cancel(CancelWorkOrder {
            work_order_id,
            reason: reason.into(),
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_work_order(work_order_id, cmd)
    }

    // ---- user administration ----

    pub fn create_user(
        &self,
        actor_id: UserId,
        principal: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        department_id: Option<DepartmentId>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageUsers, Some(&user_target(None)))?;

        let user_id = UserId::new();
        let cmd = UserCommand::Create(CreateUser {
            user_id,
            principal: principal.into(),
            display_name: display_name.into(),
            email: email.into(),
            role,
            department_id,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_user(user_id, cmd)
    }

    pub fn change_role(
        &self,
        actor_id: UserId,
        user_id: UserId,
        new_role: Role,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageUsers, Some(&user_target(Some(user_id))))?;

        let cmd = UserCommand::ChangeRole(ChangeRole {
            user_id,
            new_role,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_user(user_id, cmd)
    }

    pub fn assign_user_department(
        &self,
        actor_id: UserId,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageUsers, Some(&user_target(Some(user_id))))?;

        let cmd = UserCommand::AssignDepartment(AssignDepartment {
            user_id,
            department_id,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_user(user_id, cmd)
    }

    pub fn deactivate_user(
        &self,
        actor_id: UserId,
        user_id: UserId,
        reason: impl Into<String>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageUsers, Some(&user_target(Some(user_id))))?;

        let cmd = UserCommand::Deactivate(DeactivateUser {
            user_id,
            reason: reason.into(),
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_user(user_id, cmd)
    }

    pub fn reactivate_user(
        &self,
        actor_id: UserId,
        user_id: UserId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageUsers, Some(&user_target(Some(user_id))))?;

        let cmd = UserCommand::Reactivate(ReactivateUser {
            user_id,
            actor_id,
            actor_role: actor.role,
            occurred_at: Utc::now(),
        });
        self.dispatch_user(user_id, cmd)
    }

    // ---- departments ----

    pub fn create_department(
        &self,
        actor_id: UserId,
        name: impl Into<String>,
        code: impl Into<String>,
        parent: Option<DepartmentId>,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageDepartments, None)?;

        let department_id = DepartmentId::new();
        let cmd = DepartmentCommand::Create(CreateDepartment {
            department_id,
            name: name.into(),
            code: code.into(),
            parent,
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_department(department_id, cmd)
    }

    pub fn assign_department_manager(
        &self,
        actor_id: UserId,
        department_id: DepartmentId,
        manager: UserId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageDepartments, None)?;

        let snapshot = self.user_snapshot(manager)?;
        let cmd = DepartmentCommand::AssignManager(AssignManager {
            department_id,
            manager,
            manager_role: snapshot.role,
            manager_active: snapshot.is_active(),
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_department(department_id, cmd)
    }

    pub fn deactivate_department(
        &self,
        actor_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageDepartments, None)?;

        let department: Department = self
            .dispatcher
            .load(department_id.into(), |id| {
                Department::empty(DepartmentId::from(id))
            })?;
        if let Some(manager) = department.manager() {
            tracing::warn!(
                department_id = %department_id,
                manager = %manager,
                "deactivating a department that still has a manager assigned"
            );
        }

        let cmd = DepartmentCommand::Deactivate(DeactivateDepartment {
            department_id,
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_department(department_id, cmd)
    }

    pub fn reactivate_department(
        &self,
        actor_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Outcome, ServiceError> {
        let actor = self.actor(actor_id)?;
        self.check(&actor, Action::ManageDepartments, None)?;

        let cmd = DepartmentCommand::Reactivate(ReactivateDepartment {
            department_id,
            actor_id,
            occurred_at: Utc::now(),
        });
        self.dispatch_department(department_id, cmd)
    }

    // ---- pipeline helpers ----

    fn actor(&self, actor_id: UserId) -> Result<Actor, ServiceError> {
        Ok(self.user_snapshot(actor_id)?.actor())
    }

    fn user_snapshot(&self, user_id: UserId) -> Result<UserRecord, ServiceError> {
        self.directory
            .find_by_id(user_id)
            .ok_or(ServiceError::UnknownUser(user_id))
    }

    fn check(
        &self,
        actor: &Actor,
        action: Action,
        target: Option<&TargetContext>,
    ) -> Result<(), ServiceError> {
        if let Err(err) = authorize(actor, action, target) {
            tracing::warn!(
                actor = %actor.user_id,
                role = %actor.role,
                action = %action,
                error = %err,
                "authorization denied"
            );
            return Err(ServiceError::Authz(err));
        }
        Ok(())
    }

    fn load_call(&self, call_id: CallId) -> Result<MaintenanceCall, ServiceError> {
        let call: MaintenanceCall = self
            .dispatcher
            .load(call_id.0, |id| MaintenanceCall::empty(CallId::new(id)))?;
        if call.version() == 0 {
            return Err(ServiceError::Dispatch(DispatchError::NotFound));
        }
        Ok(call)
    }

    /// Load a work order plus the authorization context derived from it and
    /// its originating call (the call carries the department).
    fn load_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<(WorkOrder, TargetContext), ServiceError> {
        let wo: WorkOrder = self
            .dispatcher
            .load(work_order_id.0, |id| WorkOrder::empty(WorkOrderId::new(id)))?;
        if wo.version() == 0 {
            return Err(ServiceError::Dispatch(DispatchError::NotFound));
        }

        let department_id = match wo.call_id() {
            Some(call_id) => self.load_call(call_id)?.department_id(),
            None => None,
        };
        let target = TargetContext {
            reporter: None,
            assignee: wo.assignee(),
            department_id,
            target_user: None,
        };
        Ok((wo, target))
    }

    fn dispatch_call(&self, call_id: CallId, cmd: CallCommand) -> Result<Outcome, ServiceError> {
        let (call, committed) = self.dispatcher.dispatch(call_id.0, CALL_AGGREGATE, cmd, |id| {
            MaintenanceCall::empty(CallId::new(id))
        })?;
        self.emit_notices(&committed);
        Ok(Outcome {
            entity_id: call_id.0,
            reference: call.number().map(|n| n.to_string()),
            new_state: call.status().to_string(),
        })
    }

    fn dispatch_work_order(
        &self,
        work_order_id: WorkOrderId,
        cmd: WorkOrderCommand,
    ) -> Result<Outcome, ServiceError> {
        let (wo, committed) =
            self.dispatcher
                .dispatch(work_order_id.0, WORKORDER_AGGREGATE, cmd, |id| {
                    WorkOrder::empty(WorkOrderId::new(id))
                })?;
        self.emit_notices(&committed);
        Ok(Outcome {
            entity_id: work_order_id.0,
            reference: wo.number().map(|n| n.to_string()),
            new_state: wo.status().to_string(),
        })
    }

    fn dispatch_user(&self, user_id: UserId, cmd: UserCommand) -> Result<Outcome, ServiceError> {
        let (user, committed) =
            self.dispatcher
                .dispatch(user_id.into(), USER_AGGREGATE, cmd, |id| {
                    User::empty(UserId::from(id))
                })?;
        self.emit_notices(&committed);

        // The directory is the read model of user streams; keep it current.
        self.directory.upsert(UserRecord {
            user_id: user.id_typed(),
            principal: user.principal().to_string(),
            display_name: user.display_name().to_string(),
            email: user.email().to_string(),
            role: user.role(),
            department_id: user.department_id(),
            status: user.status(),
        });

        Ok(Outcome {
            entity_id: user_id.into(),
            reference: None,
            new_state: match user.status() {
                UserStatus::Active => "active".to_string(),
                UserStatus::Inactive => "inactive".to_string(),
            },
        })
    }

    fn dispatch_department(
        &self,
        department_id: DepartmentId,
        cmd: DepartmentCommand,
    ) -> Result<Outcome, ServiceError> {
        let (department, committed) =
            self.dispatcher
                .dispatch(department_id.into(), DEPARTMENT_AGGREGATE, cmd, |id| {
                    Department::empty(DepartmentId::from(id))
                })?;
        self.emit_notices(&committed);
        Ok(Outcome {
            entity_id: department_id.into(),
            reference: Some(department.code().to_string()),
            new_state: if department.is_active() {
                "active".to_string()
            } else {
                "inactive".to_string()
            },
        })
    }

    fn emit_notices(&self, committed: &[StoredEvent]) {
        for stored in committed {
            let notice = LifecycleNotice::from_envelope(&stored.to_envelope());
            self.notifier.notify(&notice);
        }
    }
}

fn call_target(call: &MaintenanceCall) -> TargetContext {
    TargetContext {
        reporter: call.reporter(),
        assignee: call.assignee(),
        department_id: call.department_id(),
        target_user: None,
    }
}

fn user_target(target_user: Option<UserId>) -> TargetContext {
    TargetContext {
        target_user,
        ..TargetContext::default()
    }
}
