use crate::connection::{ConnectionId, UserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Presence registry: which user is reachable on which connection.
///
/// Holds at most one connection per user. A later registration for the same
/// user overwrites the earlier one (last-registered-wins), which is also how
/// entries left behind by ungraceful disconnects get replaced.
///
/// The map sits behind a single mutex so that `snapshot` always observes a
/// fully applied mutation.
pub struct ConnectionRegistry {
    users: Mutex<HashMap<UserId, ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    fn users(&self) -> MutexGuard<'_, HashMap<UserId, ConnectionId>> {
        // Every critical section leaves the map valid, so a poisoned lock is still usable.
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Map `user_id` to `connection_id`, replacing any previous mapping.
    /// Returns the connection id that was replaced, if any.
    pub fn register(&self, user_id: UserId, connection_id: ConnectionId) -> Option<ConnectionId> {
        self.users().insert(user_id, connection_id)
    }

    /// Remove the mapping for `user_id`. Absent users are a no-op.
    pub fn unregister(&self, user_id: &str) -> Option<ConnectionId> {
        self.users().remove(user_id)
    }

    /// Remove the mapping for `user_id` only if it still points at
    /// `connection_id`. A superseded connection closing late must not evict
    /// the user's newer connection.
    pub fn unregister_connection(&self, user_id: &str, connection_id: &ConnectionId) -> bool {
        let mut users = self.users();
        match users.get(user_id) {
            Some(current) if current == connection_id => {
                users.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Connection currently registered for `user_id`; `None` means offline.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionId> {
        self.users().get(user_id).cloned()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users().contains_key(user_id)
    }

    /// Point-in-time list of online users, sorted for stable output.
    pub fn snapshot(&self) -> Vec<UserId> {
        let mut online: Vec<UserId> = self.users().keys().cloned().collect();
        online.sort_unstable();
        online
    }

    pub fn len(&self) -> usize {
        self.users().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users().is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
