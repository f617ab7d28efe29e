use serde::Serialize;
use thiserror::Error;

use fixdesk_core::{DepartmentId, UserId};

use crate::action::{Action, Scope};
use crate::roles::Role;

/// A fully resolved actor for authorization decisions.
///
/// Construction is decoupled from storage and transport: callers derive this
/// from a [`crate::UserRecord`] after the identity resolver has mapped the
/// external principal to a stored user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    pub active: bool,
}

/// Snapshot of the target entity an action operates on.
///
/// Only the fields relevant to ownership checks; `None` fields simply fail
/// the corresponding ownership test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetContext {
    pub reporter: Option<UserId>,
    pub assignee: Option<UserId>,
    pub department_id: Option<DepartmentId>,
    /// For user-management actions: the user being managed.
    pub target_user: Option<UserId>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("actor is inactive")]
    InactiveActor,

    #[error("role '{role}' lacks permission for '{action}'")]
    InsufficientRole { role: Role, action: Action },

    #[error("actor is neither the reporter nor the assignee of the target")]
    NotParticipant,

    #[error("actor is not the current assignee of the target")]
    NotAssignee,

    #[error("target is outside the actor's department")]
    OutsideDepartment,

    #[error("admins may not change or deactivate their own account")]
    SelfManagement,
}

/// Authorize an actor for an action against an optional target.
///
/// - No IO
/// - No panics
/// - No lifecycle logic (state-transition validity is the engine's job;
///   this is purely the role/ownership capability table)
pub fn authorize(
    actor: &Actor,
    action: Action,
    target: Option<&TargetContext>,
) -> Result<(), AuthzError> {
    if !actor.active {
        return Err(AuthzError::InactiveActor);
    }

    if actor.role < action.min_role() {
        return Err(AuthzError::InsufficientRole {
            role: actor.role,
            action,
        });
    }

    if actor.role == Role::Admin {
        // Admins bypass ownership scoping, except acting on their own account.
        if action.scope() == Scope::NotSelf
            && target.and_then(|t| t.target_user) == Some(actor.user_id)
        {
            return Err(AuthzError::SelfManagement);
        }
        return Ok(());
    }

    match action.scope() {
        Scope::Unrestricted => Ok(()),
        Scope::Participant => {
            if actor.role >= Role::Manager {
                return in_department(actor, target);
            }
            let t = target.ok_or(AuthzError::NotParticipant)?;
            if t.reporter == Some(actor.user_id) || t.assignee == Some(actor.user_id) {
                Ok(())
            } else {
                Err(AuthzError::NotParticipant)
            }
        }
        Scope::Assignee => {
            if actor.role >= Role::Manager {
                return in_department(actor, target);
            }
            let t = target.ok_or(AuthzError::NotAssignee)?;
            if t.assignee == Some(actor.user_id) {
                Ok(())
            } else {
                Err(AuthzError::NotAssignee)
            }
        }
        Scope::Department => in_department(actor, target),
        // Minimum role for NotSelf actions is Admin, handled above.
        Scope::NotSelf => Err(AuthzError::InsufficientRole {
            role: actor.role,
            action,
        }),
    }
}

fn in_department(actor: &Actor, target: Option<&TargetContext>) -> Result<(), AuthzError> {
    let actor_dept = actor.department_id.ok_or(AuthzError::OutsideDepartment)?;
    let target_dept = target
        .and_then(|t| t.department_id)
        .ok_or(AuthzError::OutsideDepartment)?;
    if actor_dept == target_dept {
        Ok(())
    } else {
        Err(AuthzError::OutsideDepartment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: UserId::new(),
            role,
            department_id: Some(DepartmentId::new()),
            active: true,
        }
    }

    fn call_target(actor: &Actor) -> TargetContext {
        TargetContext {
            reporter: Some(UserId::new()),
            assignee: None,
            department_id: actor.department_id,
            target_user: None,
        }
    }

    #[test]
    fn inactive_actor_is_always_denied() {
        let mut a = actor(Role::Admin);
        a.active = false;
        assert_eq!(
            authorize(&a, Action::ReportCall, None),
            Err(AuthzError::InactiveActor)
        );
    }

    #[test]
    fn user_may_report_but_not_assign() {
        let a = actor(Role::User);
        assert!(authorize(&a, Action::ReportCall, None).is_ok());
        let t = call_target(&a);
        assert!(matches!(
            authorize(&a, Action::AssignCall, Some(&t)),
            Err(AuthzError::InsufficientRole { .. })
        ));
    }

    #[test]
    fn reporter_may_comment_on_own_call() {
        let a = actor(Role::User);
        let t = TargetContext {
            reporter: Some(a.user_id),
            ..Default::default()
        };
        assert!(authorize(&a, Action::CommentOnCall, Some(&t)).is_ok());
    }

    #[test]
    fn stranger_may_not_comment_on_others_call() {
        let a = actor(Role::User);
        let t = call_target(&a);
        assert_eq!(
            authorize(&a, Action::CommentOnCall, Some(&t)),
            Err(AuthzError::NotParticipant)
        );
    }

    #[test]
    fn technician_transitions_only_own_assignments() {
        let a = actor(Role::Technician);
        let mut t = call_target(&a);
        assert_eq!(
            authorize(&a, Action::TransitionCall, Some(&t)),
            Err(AuthzError::NotAssignee)
        );
        t.assignee = Some(a.user_id);
        assert!(authorize(&a, Action::TransitionCall, Some(&t)).is_ok());
    }

    #[test]
    fn manager_is_scoped_to_own_department() {
        let a = actor(Role::Manager);
        let mut t = call_target(&a);
        assert!(authorize(&a, Action::AssignCall, Some(&t)).is_ok());

        t.department_id = Some(DepartmentId::new());
        assert_eq!(
            authorize(&a, Action::AssignCall, Some(&t)),
            Err(AuthzError::OutsideDepartment)
        );
    }

    #[test]
    fn admin_crosses_departments() {
        let a = actor(Role::Admin);
        let t = TargetContext {
            department_id: Some(DepartmentId::new()),
            ..Default::default()
        };
        assert!(authorize(&a, Action::AssignCall, Some(&t)).is_ok());
        assert!(authorize(&a, Action::ManageDepartments, None).is_ok());
    }

    #[test]
    fn admin_may_not_manage_own_account() {
        let a = actor(Role::Admin);
        let t = TargetContext {
            target_user: Some(a.user_id),
            ..Default::default()
        };
        assert_eq!(
            authorize(&a, Action::ManageUsers, Some(&t)),
            Err(AuthzError::SelfManagement)
        );

        let other = TargetContext {
            target_user: Some(UserId::new()),
            ..Default::default()
        };
        assert!(authorize(&a, Action::ManageUsers, Some(&other)).is_ok());
    }

    #[test]
    fn non_admin_never_manages_users() {
        for role in [Role::User, Role::Technician, Role::Manager] {
            let a = actor(role);
            let t = TargetContext {
                target_user: Some(UserId::new()),
                ..Default::default()
            };
            assert!(matches!(
                authorize(&a, Action::ManageUsers, Some(&t)),
                Err(AuthzError::InsufficientRole { .. })
            ));
        }
    }

    proptest! {
        /// Every (role, action) pair below the action's minimum role is denied,
        /// regardless of how the target looks.
        #[test]
        fn below_minimum_role_is_denied(
            role_idx in 0usize..Role::ALL.len(),
            action_idx in 0usize..Action::ALL.len(),
            owns_target in any::<bool>(),
        ) {
            let role = Role::ALL[role_idx];
            let action = Action::ALL[action_idx];
            prop_assume!(role < action.min_role());

            let a = actor(role);
            let t = TargetContext {
                reporter: owns_target.then_some(a.user_id),
                assignee: owns_target.then_some(a.user_id),
                department_id: a.department_id,
                target_user: Some(UserId::new()),
            };

            prop_assert_eq!(
                authorize(&a, action, Some(&t)),
                Err(AuthzError::InsufficientRole { role, action })
            );
        }

        /// Actors meeting the minimum role and owning the target are granted
        /// every non-admin action; admin-only actions stay admin-only.
        #[test]
        fn sufficient_role_with_ownership_is_granted(
            action_idx in 0usize..Action::ALL.len(),
        ) {
            let action = Action::ALL[action_idx];
            let a = actor(action.min_role());
            let t = TargetContext {
                reporter: Some(a.user_id),
                assignee: Some(a.user_id),
                department_id: a.department_id,
                target_user: Some(UserId::new()),
            };

            prop_assert!(authorize(&a, action, Some(&t)).is_ok());
        }
    }
}
