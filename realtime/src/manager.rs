use crate::connection::{ConnectionId, FrameSender, SessionTable, UserId};
use crate::lifecycle::{Connection, ConnectionLifecycleHandler, Handshake};
use crate::message::Event;
use crate::notification::{Delivery, NotificationRouter};
use crate::presence::PresenceBroadcaster;
use crate::registry::ConnectionRegistry;
use std::sync::Arc;

/// Owns the realtime components for the lifetime of the process and wires
/// them to the same registry and session table.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
    broadcaster: Arc<PresenceBroadcaster>,
    lifecycle: ConnectionLifecycleHandler,
    router: NotificationRouter,
}

impl Manager {
    pub fn new() -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let sessions = Arc::new(SessionTable::new());
        let broadcaster = Arc::new(PresenceBroadcaster::new(
            registry.clone(),
            sessions.clone(),
        ));
        let lifecycle =
            ConnectionLifecycleHandler::new(registry.clone(), sessions.clone(), broadcaster.clone());
        let router = NotificationRouter::new(registry.clone(), sessions.clone());

        Self {
            registry,
            sessions,
            broadcaster,
            lifecycle,
            router,
        }
    }

    /// Accept a new transport session
    pub fn connect(&self, handshake: &Handshake, sender: FrameSender) -> Connection {
        self.lifecycle.connect(handshake, sender)
    }

    /// Tear down a session after the transport closed
    pub fn disconnect(&self, connection: &mut Connection) {
        self.lifecycle.disconnect(connection)
    }

    /// Push an event to one user if they are online
    pub fn notify(&self, user_id: &str, event: &Event) -> Delivery {
        self.router.notify(user_id, event)
    }

    /// Re-announce the current presence set to every session
    pub fn broadcast_online_users(&self) -> usize {
        self.broadcaster.broadcast_online_users()
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionId> {
        self.registry.lookup(user_id)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.registry.is_online(user_id)
    }

    pub fn online_users(&self) -> Vec<UserId> {
        self.registry.snapshot()
    }

    /// Number of open sessions, bound or not
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
