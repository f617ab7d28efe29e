//! In-memory user directory (identity read model).

use std::collections::HashMap;
use std::sync::RwLock;

use fixdesk_auth::{UserDirectory, UserRecord};
use fixdesk_core::UserId;

/// Directory backed by a mutex-guarded map.
///
/// Kept current by whoever dispatches user commands; suitable for tests and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for InMemoryDirectory {
    fn find_by_id(&self, id: UserId) -> Option<UserRecord> {
        self.records.read().ok()?.get(&id).cloned()
    }

    fn find_by_principal(&self, principal: &str) -> Option<UserRecord> {
        self.records
            .read()
            .ok()?
            .values()
            .find(|r| r.principal == principal)
            .cloned()
    }

    fn upsert(&self, record: UserRecord) {
        if let Ok(mut records) = self.records.write() {
            records.insert(record.user_id, record);
        }
    }
}
