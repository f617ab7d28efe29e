use core::str::FromStr;

use serde::{Deserialize, Serialize};

use fixdesk_core::DomainError;

/// Role assigned to a user, ordered by capability.
///
/// The ordering is load-bearing: a higher role implies every *view-level*
/// capability of the roles below it. Mutation of others' work is still gated
/// by ownership rules in [`crate::authorize`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reports calls and follows their own.
    #[default]
    User,
    /// Accepts and works calls assigned to them.
    Technician,
    /// Assigns work and approves work orders within their department.
    Manager,
    /// Unrestricted, including user/department management.
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Technician, Role::Manager, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Technician => "technician",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Whether a user with this role may hold call/work-order assignments.
    pub fn can_be_assignee(self) -> bool {
        matches!(self, Role::Technician | Role::Manager)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "technician" => Ok(Role::Technician),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_capability() {
        assert!(Role::User < Role::Technician);
        assert!(Role::Technician < Role::Manager);
        assert!(Role::Manager < Role::Admin);
    }

    #[test]
    fn only_technicians_and_managers_take_assignments() {
        assert!(!Role::User.can_be_assignee());
        assert!(Role::Technician.can_be_assignee());
        assert!(Role::Manager.can_be_assignee());
        assert!(!Role::Admin.can_be_assignee());
    }

    #[test]
    fn parse_round_trips() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("supervisor".parse::<Role>().is_err());
    }
}
