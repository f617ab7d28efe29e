use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Closed set of operations subject to authorization.
///
/// Each action carries a minimum role and an ownership rule; both are
/// evaluated by [`crate::authorize`]. Handlers never check roles inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReportCall,
    ViewCall,
    CommentOnCall,
    /// Technician self-assigning an open call.
    AcceptCall,
    AssignCall,
    TransitionCall,
    CancelCall,
    CreateWorkOrder,
    ApproveWorkOrder,
    TransitionWorkOrder,
    CancelWorkOrder,
    ManageUsers,
    ManageDepartments,
}

/// How an action is scoped to its target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// No target-level restriction beyond the minimum role.
    Unrestricted,
    /// Actor must be the target's reporter or assignee; managers are limited
    /// to their own department, admins see everything.
    Participant,
    /// Actor must be the target's current assignee; managers are limited to
    /// their own department, admins are unrestricted.
    Assignee,
    /// Managers act only within their own department; admins anywhere.
    Department,
    /// Admin-only action that must not target the acting admin themselves.
    NotSelf,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::ReportCall,
        Action::ViewCall,
        Action::CommentOnCall,
        Action::AcceptCall,
        Action::AssignCall,
        Action::TransitionCall,
        Action::CancelCall,
        Action::CreateWorkOrder,
        Action::ApproveWorkOrder,
        Action::TransitionWorkOrder,
        Action::CancelWorkOrder,
        Action::ManageUsers,
        Action::ManageDepartments,
    ];

    /// Minimum role required before ownership rules are even considered.
    pub fn min_role(self) -> Role {
        match self {
            Action::ReportCall | Action::ViewCall | Action::CommentOnCall => Role::User,
            Action::AcceptCall | Action::TransitionCall | Action::TransitionWorkOrder => {
                Role::Technician
            }
            Action::AssignCall
            | Action::CancelCall
            | Action::CreateWorkOrder
            | Action::ApproveWorkOrder
            | Action::CancelWorkOrder => Role::Manager,
            Action::ManageUsers | Action::ManageDepartments => Role::Admin,
        }
    }

    pub(crate) fn scope(self) -> Scope {
        match self {
            Action::ReportCall | Action::AcceptCall | Action::ManageDepartments => {
                Scope::Unrestricted
            }
            Action::ViewCall | Action::CommentOnCall => Scope::Participant,
            Action::TransitionCall | Action::TransitionWorkOrder => Scope::Assignee,
            Action::AssignCall
            | Action::CancelCall
            | Action::CreateWorkOrder
            | Action::ApproveWorkOrder
            | Action::CancelWorkOrder => Scope::Department,
            Action::ManageUsers => Scope::NotSelf,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::ReportCall => "report_call",
            Action::ViewCall => "view_call",
            Action::CommentOnCall => "comment_on_call",
            Action::AcceptCall => "accept_call",
            Action::AssignCall => "assign_call",
            Action::TransitionCall => "transition_call",
            Action::CancelCall => "cancel_call",
            Action::CreateWorkOrder => "create_work_order",
            Action::ApproveWorkOrder => "approve_work_order",
            Action::TransitionWorkOrder => "transition_work_order",
            Action::CancelWorkOrder => "cancel_work_order",
            Action::ManageUsers => "manage_users",
            Action::ManageDepartments => "manage_departments",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
