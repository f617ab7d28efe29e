//! User aggregate for identity management (event-sourced).
//!
//! # Invariants
//! - Principal name is immutable after creation.
//! - Role changes and status changes are admin actions.
//! - Admins cannot change their own role or deactivate themselves.
//! - Users are never hard-deleted; deactivation is a status flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixdesk_core::{Aggregate, AggregateRoot, DepartmentId, DomainError, UserId};
use fixdesk_events::Event;

use crate::roles::Role;

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// User can authenticate and act.
    #[default]
    Active,
    /// User cannot authenticate; record is retained.
    Inactive,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => f.write_str("active"),
            UserStatus::Inactive => f.write_str("inactive"),
        }
    }
}

/// Aggregate root: User.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    principal: String,
    display_name: String,
    email: String,
    role: Role,
    department_id: Option<DepartmentId>,
    status: UserStatus,
    version: u64,
    created: bool,
}

impl User {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            principal: String::new(),
            display_name: String::new(),
            email: String::new(),
            role: Role::User,
            department_id: None,
            status: UserStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_admin_acting_on_other(
        &self,
        actor_id: UserId,
        actor_role: Role,
    ) -> Result<(), DomainError> {
        if actor_role != Role::Admin {
            return Err(DomainError::forbidden("user management requires admin"));
        }
        if actor_id == self.id {
            return Err(DomainError::forbidden(
                "admins may not change or deactivate their own account",
            ));
        }
        Ok(())
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ProvisionUser (first successful authentication).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionUser {
    pub user_id: UserId,
    pub principal: String,
    pub display_name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreateUser (admin-created account with an explicit role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_id: UserId,
    pub principal: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeRole (admin only, never on self).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRole {
    pub user_id: UserId,
    pub new_role: Role,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignDepartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDepartment {
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateUser (status flag, never a hard delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateUser {
    pub user_id: UserId,
    pub reason: String,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateUser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateUser {
    pub user_id: UserId,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    Provision(ProvisionUser),
    Create(CreateUser),
    ChangeRole(ChangeRole),
    AssignDepartment(AssignDepartment),
    Deactivate(DeactivateUser),
    Reactivate(ReactivateUser),
}

/// Event: UserProvisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProvisioned {
    pub user_id: UserId,
    pub principal: String,
    pub display_name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UserCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: UserId,
    pub principal: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RoleChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChanged {
    pub user_id: UserId,
    pub previous_role: Role,
    pub new_role: Role,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DepartmentAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentAssigned {
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UserDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeactivated {
    pub user_id: UserId,
    pub reason: String,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UserReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReactivated {
    pub user_id: UserId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Provisioned(UserProvisioned),
    Created(UserCreated),
    RoleChanged(RoleChanged),
    DepartmentAssigned(DepartmentAssigned),
    Deactivated(UserDeactivated),
    Reactivated(UserReactivated),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Provisioned(_) => "user.provisioned",
            UserEvent::Created(_) => "user.created",
            UserEvent::RoleChanged(_) => "user.role_changed",
            UserEvent::DepartmentAssigned(_) => "user.department_assigned",
            UserEvent::Deactivated(_) => "user.deactivated",
            UserEvent::Reactivated(_) => "user.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Provisioned(e) => e.occurred_at,
            UserEvent::Created(e) => e.occurred_at,
            UserEvent::RoleChanged(e) => e.occurred_at,
            UserEvent::DepartmentAssigned(e) => e.occurred_at,
            UserEvent::Deactivated(e) => e.occurred_at,
            UserEvent::Reactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Provisioned(e) => {
                self.id = e.user_id;
                self.principal = e.principal.clone();
                self.display_name = e.display_name.clone();
                self.email = e.email.clone();
                self.role = Role::User;
                self.status = UserStatus::Active;
                self.created = true;
            }
            UserEvent::Created(e) => {
                self.id = e.user_id;
                self.principal = e.principal.clone();
                self.display_name = e.display_name.clone();
                self.email = e.email.clone();
                self.role = e.role;
                self.department_id = e.department_id;
                self.status = UserStatus::Active;
                self.created = true;
            }
            UserEvent::RoleChanged(e) => {
                self.role = e.new_role;
            }
            UserEvent::DepartmentAssigned(e) => {
                self.department_id = Some(e.department_id);
            }
            UserEvent::Deactivated(_) => {
                self.status = UserStatus::Inactive;
            }
            UserEvent::Reactivated(_) => {
                self.status = UserStatus::Active;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Provision(cmd) => self.handle_provision(cmd),
            UserCommand::Create(cmd) => self.handle_create(cmd),
            UserCommand::ChangeRole(cmd) => self.handle_change_role(cmd),
            UserCommand::AssignDepartment(cmd) => self.handle_assign_department(cmd),
            UserCommand::Deactivate(cmd) => self.handle_deactivate(cmd),
            UserCommand::Reactivate(cmd) => self.handle_reactivate(cmd),
        }
    }
}

impl User {
    fn validate_identity(principal: &str, display_name: &str, email: &str) -> Result<(), DomainError> {
        if principal.trim().is_empty() {
            return Err(DomainError::validation("principal cannot be empty"));
        }
        if display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        Ok(())
    }

    fn handle_provision(&self, cmd: &ProvisionUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("user already exists"));
        }
        Self::validate_identity(&cmd.principal, &cmd.display_name, &cmd.email)?;

        Ok(vec![UserEvent::Provisioned(UserProvisioned {
            user_id: cmd.user_id,
            principal: cmd.principal.trim().to_string(),
            display_name: cmd.display_name.trim().to_string(),
            email: cmd.email.trim().to_lowercase(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_create(&self, cmd: &CreateUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("user already exists"));
        }
        if cmd.actor_role != Role::Admin {
            return Err(DomainError::forbidden("user creation requires admin"));
        }
        Self::validate_identity(&cmd.principal, &cmd.display_name, &cmd.email)?;

        Ok(vec![UserEvent::Created(UserCreated {
            user_id: cmd.user_id,
            principal: cmd.principal.trim().to_string(),
            display_name: cmd.display_name.trim().to_string(),
            email: cmd.email.trim().to_lowercase(),
            role: cmd.role,
            department_id: cmd.department_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_role(&self, cmd: &ChangeRole) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_admin_acting_on_other(cmd.actor_id, cmd.actor_role)?;

        if self.role == cmd.new_role {
            return Err(DomainError::invariant("user already has this role"));
        }

        Ok(vec![UserEvent::RoleChanged(RoleChanged {
            user_id: cmd.user_id,
            previous_role: self.role,
            new_role: cmd.new_role,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_department(
        &self,
        cmd: &AssignDepartment,
    ) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;
        if cmd.actor_role != Role::Admin {
            return Err(DomainError::forbidden("user management requires admin"));
        }

        Ok(vec![UserEvent::DepartmentAssigned(DepartmentAssigned {
            user_id: cmd.user_id,
            department_id: cmd.department_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_admin_acting_on_other(cmd.actor_id, cmd.actor_role)?;

        if self.status == UserStatus::Inactive {
            return Err(DomainError::invariant("user already inactive"));
        }

        Ok(vec![UserEvent::Deactivated(UserDeactivated {
            user_id: cmd.user_id,
            reason: cmd.reason.clone(),
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &ReactivateUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;
        if cmd.actor_role != Role::Admin {
            return Err(DomainError::forbidden("user management requires admin"));
        }

        if self.status == UserStatus::Active {
            return Err(DomainError::invariant("user already active"));
        }

        Ok(vec![UserEvent::Reactivated(UserReactivated {
            user_id: cmd.user_id,
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

    fn provisioned_user(id: UserId) -> User {
        let mut user = User::empty(id);
        let events = user
            .handle(&UserCommand::Provision(ProvisionUser {
                user_id: id,
                principal: "GOV\\tgreen".to_string(),
                display_name: "T. Green".to_string(),
                email: "tgreen@example.gov".to_string(),
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }
        user
    }

    #[test]
    fn provision_defaults_to_user_role_and_active_status() {
        let id = UserId::new();
        let user = provisioned_user(id);

        assert_eq!(user.role(), Role::User);
        assert_eq!(user.status(), UserStatus::Active);
        assert_eq!(user.principal(), "GOV\\tgreen");
        assert_eq!(user.version(), 1);
    }

    #[test]
    fn provision_rejects_blank_principal() {
        let id = UserId::new();
        let user = User::empty(id);
        let err = user
            .handle(&UserCommand::Provision(ProvisionUser {
                user_id: id,
                principal: "  ".to_string(),
                display_name: "X".to_string(),
                email: "x@example.gov".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn admin_changes_role_of_another_user() {
        let id = UserId::new();
        let mut user = provisioned_user(id);
        let admin = UserId::new();

        let events = user
            .handle(&UserCommand::ChangeRole(ChangeRole {
                user_id: id,
                new_role: Role::Technician,
                actor_id: admin,
                actor_role: Role::Admin,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }

        assert_eq!(user.role(), Role::Technician);
        match &events[0] {
            UserEvent::RoleChanged(e) => {
                assert_eq!(e.previous_role, Role::User);
                assert_eq!(e.new_role, Role::Technician);
            }
            other => panic!("expected RoleChanged, got {other:?}"),
        }
    }

    #[test]
    fn non_admin_cannot_change_roles() {
        let id = UserId::new();
        let user = provisioned_user(id);

        let err = user
            .handle(&UserCommand::ChangeRole(ChangeRole {
                user_id: id,
                new_role: Role::Manager,
                actor_id: UserId::new(),
                actor_role: Role::Manager,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn admin_cannot_demote_or_deactivate_self() {
        let id = UserId::new();
        let mut user = provisioned_user(id);
        user.apply(&UserEvent::RoleChanged(RoleChanged {
            user_id: id,
            previous_role: Role::User,
            new_role: Role::Admin,
            actor_id: UserId::new(),
            occurred_at: now(),
        }));

        let err = user
            .handle(&UserCommand::ChangeRole(ChangeRole {
                user_id: id,
                new_role: Role::User,
                actor_id: id,
                actor_role: Role::Admin,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = user
            .handle(&UserCommand::Deactivate(DeactivateUser {
                user_id: id,
                reason: "left the department".to_string(),
                actor_id: id,
                actor_role: Role::Admin,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn deactivation_is_a_status_flag() {
        let id = UserId::new();
        let mut user = provisioned_user(id);
        let admin = UserId::new();

        let events = user
            .handle(&UserCommand::Deactivate(DeactivateUser {
                user_id: id,
                reason: "retired".to_string(),
                actor_id: admin,
                actor_role: Role::Admin,
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }

        assert_eq!(user.status(), UserStatus::Inactive);
        // Record survives; identity is intact.
        assert_eq!(user.principal(), "GOV\\tgreen");

        let err = user
            .handle(&UserCommand::Deactivate(DeactivateUser {
                user_id: id,
                reason: "again".to_string(),
                actor_id: admin,
                actor_role: Role::Admin,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
