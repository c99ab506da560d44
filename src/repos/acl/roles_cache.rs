//! RolesCacheImpl keeps the roles read from the db for every user seen so far.
//! Entries are only replaced or dropped on role changes, never evicted, so the map is
//! bounded by the number of accounts and holds a few bytes per account.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use models::authorization::*;
use models::UserId;

#[derive(Default, Clone)]
pub struct RolesCacheImpl {
    roles_cache: Arc<Mutex<HashMap<UserId, Vec<Role>>>>,
}

impl RolesCacheImpl {
    fn lock(&self) -> MutexGuard<HashMap<UserId, Vec<Role>>> {
        // a panic while holding the lock leaves the map itself intact
        self.roles_cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, user_id: UserId) -> Option<Vec<Role>> {
        self.lock().get(&user_id).cloned()
    }

    pub fn remove(&self, user_id: UserId) {
        self.lock().remove(&user_id);
    }

    pub fn add_roles(&self, user_id: UserId, roles: &[Role]) {
        self.lock().insert(user_id, roles.to_vec());
    }
}
