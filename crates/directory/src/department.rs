use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixdesk_core::{Aggregate, AggregateRoot, DepartmentId, DomainError, UserId};
use fixdesk_auth::Role;
use fixdesk_events::Event;

/// Aggregate root: Department.
///
/// Departments form a tree via the optional parent reference and optionally
/// carry a manager. Deactivation is a status flag; the record is retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    id: DepartmentId,
    name: String,
    code: String,
    parent: Option<DepartmentId>,
    manager: Option<UserId>,
    active: bool,
    version: u64,
    created: bool,
}

impl Department {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: DepartmentId) -> Self {
        Self {
            id,
            name: String::new(),
            code: String::new(),
            parent: None,
            manager: None,
            active: true,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DepartmentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn parent(&self) -> Option<DepartmentId> {
        self.parent
    }

    pub fn manager(&self) -> Option<UserId> {
        self.manager
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }
}

impl AggregateRoot for Department {
    type Id = DepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateDepartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDepartment {
    pub department_id: DepartmentId,
    pub name: String,
    /// Unique short code (uniqueness enforced by the caller's registry).
    pub code: String,
    pub parent: Option<DepartmentId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignManager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignManager {
    pub department_id: DepartmentId,
    pub manager: UserId,
    pub manager_role: Role,
    pub manager_active: bool,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetParent (re-home a department in the tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetParent {
    pub department_id: DepartmentId,
    pub parent: Option<DepartmentId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateDepartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateDepartment {
    pub department_id: DepartmentId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateDepartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateDepartment {
    pub department_id: DepartmentId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartmentCommand {
    Create(CreateDepartment),
    AssignManager(AssignManager),
    SetParent(SetParent),
    Deactivate(DeactivateDepartment),
    Reactivate(ReactivateDepartment),
}

/// Event: DepartmentCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCreated {
    pub department_id: DepartmentId,
    pub name: String,
    pub code: String,
    pub parent: Option<DepartmentId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ManagerAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerAssigned {
    pub department_id: DepartmentId,
    pub manager: UserId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ParentChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentChanged {
    pub department_id: DepartmentId,
    pub parent: Option<DepartmentId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DepartmentDeactivated.
///
/// Carries the manager at the time of deactivation so downstream consumers
/// can flag an admin deactivating a department they themselves manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentDeactivated {
    pub department_id: DepartmentId,
    pub manager: Option<UserId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DepartmentReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentReactivated {
    pub department_id: DepartmentId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartmentEvent {
    Created(DepartmentCreated),
    ManagerAssigned(ManagerAssigned),
    ParentChanged(ParentChanged),
    Deactivated(DepartmentDeactivated),
    Reactivated(DepartmentReactivated),
}

impl Event for DepartmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DepartmentEvent::Created(_) => "department.created",
            DepartmentEvent::ManagerAssigned(_) => "department.manager_assigned",
            DepartmentEvent::ParentChanged(_) => "department.parent_changed",
            DepartmentEvent::Deactivated(_) => "department.deactivated",
            DepartmentEvent::Reactivated(_) => "department.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DepartmentEvent::Created(e) => e.occurred_at,
            DepartmentEvent::ManagerAssigned(e) => e.occurred_at,
            DepartmentEvent::ParentChanged(e) => e.occurred_at,
            DepartmentEvent::Deactivated(e) => e.occurred_at,
            DepartmentEvent::Reactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Department {
    type Command = DepartmentCommand;
    type Event = DepartmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DepartmentEvent::Created(e) => {
                self.id = e.department_id;
                self.name = e.name.clone();
                self.code = e.code.clone();
                self.parent = e.parent;
                self.active = true;
                self.created = true;
            }
            DepartmentEvent::ManagerAssigned(e) => {
                self.manager = Some(e.manager);
            }
            DepartmentEvent::ParentChanged(e) => {
                self.parent = e.parent;
            }
            DepartmentEvent::Deactivated(_) => {
                self.active = false;
            }
            DepartmentEvent::Reactivated(_) => {
                self.active = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DepartmentCommand::Create(cmd) => self.handle_create(cmd),
            DepartmentCommand::AssignManager(cmd) => self.handle_assign_manager(cmd),
            DepartmentCommand::SetParent(cmd) => self.handle_set_parent(cmd),
            DepartmentCommand::Deactivate(cmd) => self.handle_deactivate(cmd),
            DepartmentCommand::Reactivate(cmd) => self.handle_reactivate(cmd),
        }
    }
}

impl Department {
    fn handle_create(&self, cmd: &CreateDepartment) -> Result<Vec<DepartmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("department already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("department name cannot be empty"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("department code cannot be empty"));
        }
        if cmd.parent == Some(cmd.department_id) {
            return Err(DomainError::invariant(
                "department cannot be its own parent",
            ));
        }

        Ok(vec![DepartmentEvent::Created(DepartmentCreated {
            department_id: cmd.department_id,
            name: cmd.name.trim().to_string(),
            code: cmd.code.trim().to_uppercase(),
            parent: cmd.parent,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_manager(
        &self,
        cmd: &AssignManager,
    ) -> Result<Vec<DepartmentEvent>, DomainError> {
        self.ensure_created()?;

        if !cmd.manager_active {
            return Err(DomainError::invariant(
                "cannot assign an inactive user as manager",
            ));
        }
        if cmd.manager_role < Role::Manager {
            return Err(DomainError::invariant(
                "department manager must hold the manager role",
            ));
        }

        Ok(vec![DepartmentEvent::ManagerAssigned(ManagerAssigned {
            department_id: cmd.department_id,
            manager: cmd.manager,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_parent(&self, cmd: &SetParent) -> Result<Vec<DepartmentEvent>, DomainError> {
        self.ensure_created()?;

        if cmd.parent == Some(self.id) {
            return Err(DomainError::invariant(
                "department cannot be its own parent",
            ));
        }

        Ok(vec![DepartmentEvent::ParentChanged(ParentChanged {
            department_id: cmd.department_id,
            parent: cmd.parent,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(
        &self,
        cmd: &DeactivateDepartment,
    ) -> Result<Vec<DepartmentEvent>, DomainError> {
        self.ensure_created()?;

        if !self.active {
            return Err(DomainError::invariant("department already inactive"));
        }

        // Deactivating a department the actor manages themselves is permitted;
        // the event carries the manager so the caller can flag it.
        Ok(vec![DepartmentEvent::Deactivated(DepartmentDeactivated {
            department_id: cmd.department_id,
            manager: self.manager,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(
        &self,
        cmd: &ReactivateDepartment,
    ) -> Result<Vec<DepartmentEvent>, DomainError> {
        self.ensure_created()?;

        if self.active {
            return Err(DomainError::invariant("department already active"));
        }

        Ok(vec![DepartmentEvent::Reactivated(DepartmentReactivated {
            department_id: cmd.department_id,
            actor_id: cmd.actor_id,
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

    fn created_department(id: DepartmentId) -> Department {
        let mut dept = Department::empty(id);
        let events = dept
            .handle(&DepartmentCommand::Create(CreateDepartment {
                department_id: id,
                name: "Facilities".to_string(),
                code: "fac".to_string(),
                parent: None,
                actor_id: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            dept.apply(e);
        }
        dept
    }

    #[test]
    fn create_normalizes_code_to_uppercase() {
        let dept = created_department(DepartmentId::new());
        assert_eq!(dept.code(), "FAC");
        assert!(dept.is_active());
    }

    #[test]
    fn create_rejects_blank_code() {
        let id = DepartmentId::new();
        let dept = Department::empty(id);
        let err = dept
            .handle(&DepartmentCommand::Create(CreateDepartment {
                department_id: id,
                name: "Facilities".to_string(),
                code: " ".to_string(),
                parent: None,
                actor_id: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn department_cannot_be_its_own_parent() {
        let id = DepartmentId::new();
        let dept = created_department(id);
        let err = dept
            .handle(&DepartmentCommand::SetParent(SetParent {
                department_id: id,
                parent: Some(id),
                actor_id: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn manager_must_be_active_and_hold_manager_role() {
        let id = DepartmentId::new();
        let dept = created_department(id);

        let err = dept
            .handle(&DepartmentCommand::AssignManager(AssignManager {
                department_id: id,
                manager: UserId::new(),
                manager_role: Role::Technician,
                manager_active: true,
                actor_id: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = dept
            .handle(&DepartmentCommand::AssignManager(AssignManager {
                department_id: id,
                manager: UserId::new(),
                manager_role: Role::Manager,
                manager_active: false,
                actor_id: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn deactivation_records_the_sitting_manager() {
        let id = DepartmentId::new();
        let mut dept = created_department(id);
        let manager = UserId::new();

        let events = dept
            .handle(&DepartmentCommand::AssignManager(AssignManager {
                department_id: id,
                manager,
                manager_role: Role::Manager,
                manager_active: true,
                actor_id: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            dept.apply(e);
        }

        let events = dept
            .handle(&DepartmentCommand::Deactivate(DeactivateDepartment {
                department_id: id,
                actor_id: manager,
                occurred_at: now(),
            }))
            .unwrap();

        match &events[0] {
            DepartmentEvent::Deactivated(e) => assert_eq!(e.manager, Some(manager)),
            other => panic!("expected Deactivated, got {other:?}"),
        }
    }
}
