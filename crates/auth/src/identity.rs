//! Identity resolution: mapping an external principal to a stored user.
//!
//! The authentication mechanism (network logon, local-testing override) is
//! outside this crate; by the time code here runs, the principal name is
//! trusted. This module only looks up or provisions the internal record.

use serde::{Deserialize, Serialize};

use fixdesk_core::{DepartmentId, UserId};

use crate::authorize::Actor;
use crate::roles::Role;
use crate::user::UserStatus;

/// Snapshot of a user as seen by the authorization layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// External principal name (e.g. network username). Unique.
    pub principal: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    pub status: UserStatus,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Project the record into an authorization actor.
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
            department_id: self.department_id,
            active: self.is_active(),
        }
    }
}

/// Lookup/provision boundary for user records (the identity resolver).
///
/// Implementations are read models kept current by whoever dispatches user
/// commands; the lifecycle engine only ever consumes this interface.
pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, id: UserId) -> Option<UserRecord>;

    fn find_by_principal(&self, principal: &str) -> Option<UserRecord>;

    /// Insert or replace a record (keyed by `user_id`).
    fn upsert(&self, record: UserRecord);
}

/// Resolve a principal, provisioning a default record on first sight.
///
/// New users get role `user` and active status; directory attributes
/// (display name, email) come from the upstream authentication flow.
pub fn resolve_or_provision(
    directory: &dyn UserDirectory,
    principal: &str,
    display_name: &str,
    email: &str,
) -> UserRecord {
    if let Some(existing) = directory.find_by_principal(principal) {
        return existing;
    }

    let record = UserRecord {
        user_id: UserId::new(),
        principal: principal.to_string(),
        display_name: display_name.to_string(),
        email: email.to_string(),
        role: Role::User,
        department_id: None,
        status: UserStatus::Active,
    };
    directory.upsert(record.clone());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapDirectory {
        by_id: Mutex<HashMap<UserId, UserRecord>>,
    }

    impl UserDirectory for MapDirectory {
        fn find_by_id(&self, id: UserId) -> Option<UserRecord> {
            self.by_id.lock().unwrap().get(&id).cloned()
        }

        fn find_by_principal(&self, principal: &str) -> Option<UserRecord> {
            self.by_id
                .lock()
                .unwrap()
                .values()
                .find(|r| r.principal == principal)
                .cloned()
        }

        fn upsert(&self, record: UserRecord) {
            self.by_id.lock().unwrap().insert(record.user_id, record);
        }
    }

    #[test]
    fn unknown_principal_is_provisioned_with_user_role() {
        let dir = MapDirectory::default();
        let record = resolve_or_provision(&dir, "GOV\\jsmith", "J. Smith", "jsmith@example.gov");

        assert_eq!(record.role, Role::User);
        assert_eq!(record.status, UserStatus::Active);
        assert_eq!(dir.find_by_principal("GOV\\jsmith"), Some(record));
    }

    #[test]
    fn known_principal_is_returned_unchanged() {
        let dir = MapDirectory::default();
        let first = resolve_or_provision(&dir, "GOV\\jsmith", "J. Smith", "jsmith@example.gov");
        let second = resolve_or_provision(&dir, "GOV\\jsmith", "different", "other@example.gov");

        assert_eq!(first, second);
    }
}
