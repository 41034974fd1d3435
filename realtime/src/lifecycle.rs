//! Per-connection lifecycle: `Connecting -> Bound -> Closed`.
//!
//! A connection is bound when its handshake names a user. Binding and the
//! matching unbind each run "mutate registry, then broadcast presence" as one
//! critical section, so concurrent transitions never interleave and every
//! broadcast reflects the mutation that triggered it.

use crate::connection::{ConnectionId, FrameSender, SessionTable, UserId};
use crate::presence::PresenceBroadcaster;
use crate::registry::ConnectionRegistry;
use log::*;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Values a browser client sends when it has no logged-in user.
const PLACEHOLDER_IDS: [&str; 2] = ["undefined", "null"];

/// Handshake metadata supplied when the transport session opens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Handshake {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl Handshake {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The identity to bind to, if the handshake carries a usable one.
    pub fn user_id(&self) -> Option<UserId> {
        let user_id = self.user_id.as_deref()?.trim();
        if user_id.is_empty() || PLACEHOLDER_IDS.contains(&user_id) {
            return None;
        }
        Some(user_id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Open but not associated with a user.
    Connecting,
    Bound(UserId),
    Closed,
}

/// One live transport session as seen by the lifecycle handler.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
}

impl Connection {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match &self.state {
            ConnectionState::Bound(user_id) => Some(user_id),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }
}

pub struct ConnectionLifecycleHandler {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
    broadcaster: Arc<PresenceBroadcaster>,
    transitions: Mutex<()>,
}

impl ConnectionLifecycleHandler {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<SessionTable>,
        broadcaster: Arc<PresenceBroadcaster>,
    ) -> Self {
        Self {
            registry,
            sessions,
            broadcaster,
            transitions: Mutex::new(()),
        }
    }

    /// Accept a new transport session.
    ///
    /// The session always joins the broadcast audience. If the handshake names
    /// a user the connection is bound and presence is broadcast; otherwise it
    /// stays in `Connecting` and nobody is told.
    pub fn connect(&self, handshake: &Handshake, sender: FrameSender) -> Connection {
        let connection_id = ConnectionId::new();

        let Some(user_id) = handshake.user_id() else {
            self.sessions.attach(connection_id.clone(), sender);
            debug!("Accepted unbound connection {connection_id}");
            return Connection {
                id: connection_id,
                state: ConnectionState::Connecting,
            };
        };

        let _transition = self.transitions.lock().unwrap_or_else(PoisonError::into_inner);
        self.sessions.attach(connection_id.clone(), sender);
        if let Some(previous) = self
            .registry
            .register(user_id.clone(), connection_id.clone())
        {
            debug!("User {user_id} replaced stale connection {previous}");
        }
        info!("User ID: {user_id}, Connection ID: {connection_id}");
        self.broadcaster.broadcast_online_users();

        Connection {
            id: connection_id,
            state: ConnectionState::Bound(user_id),
        }
    }

    /// Tear down a session after the transport reports it closed.
    ///
    /// Bound connections are unregistered and presence is broadcast, unless a
    /// newer connection for the same user has taken over, in which case only
    /// the session is dropped. Closing an already closed connection does nothing.
    pub fn disconnect(&self, connection: &mut Connection) {
        match std::mem::replace(&mut connection.state, ConnectionState::Closed) {
            ConnectionState::Closed => {}
            ConnectionState::Connecting => {
                self.sessions.detach(&connection.id);
                debug!("Closed unbound connection {}", connection.id);
            }
            ConnectionState::Bound(user_id) => {
                let _transition = self.transitions.lock().unwrap_or_else(PoisonError::into_inner);
                self.sessions.detach(&connection.id);
                if !self
                    .registry
                    .unregister_connection(&user_id, &connection.id)
                {
                    // The online set did not change, so there is nothing to announce
                    debug!(
                        "Connection {} for user {user_id} was already superseded",
                        connection.id
                    );
                    return;
                }
                info!("User ID: {user_id} disconnected from {}", connection.id);
                self.broadcaster.broadcast_online_users();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Frame;
    use serde_json::Value;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<SessionTable>,
        handler: ConnectionLifecycleHandler,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let sessions = Arc::new(SessionTable::new());
        let broadcaster = Arc::new(PresenceBroadcaster::new(
            registry.clone(),
            sessions.clone(),
        ));
        let handler =
            ConnectionLifecycleHandler::new(registry.clone(), sessions.clone(), broadcaster);
        Fixture {
            registry,
            sessions,
            handler,
        }
    }

    fn presence_frames(rx: &mut UnboundedReceiver<Frame>) -> Vec<Vec<String>> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let value: Value = serde_json::from_str(frame.as_str()).unwrap();
            assert_eq!(value["event"], "getOnlineUsers");
            frames.push(serde_json::from_value(value["data"].clone()).unwrap());
        }
        frames
    }

    #[test]
    fn handshake_normalizes_missing_and_placeholder_ids() {
        assert_eq!(Handshake::anonymous().user_id(), None);
        assert_eq!(Handshake::new("").user_id(), None);
        assert_eq!(Handshake::new("   ").user_id(), None);
        assert_eq!(Handshake::new("undefined").user_id(), None);
        assert_eq!(Handshake::new("null").user_id(), None);
        assert_eq!(Handshake::new(" alice ").user_id(), Some("alice".to_string()));
    }

    #[test]
    fn bound_connect_registers_and_broadcasts_once() {
        let f = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let conn = f.handler.connect(&Handshake::new("alice"), tx);

        assert_eq!(conn.user_id(), Some(&"alice".to_string()));
        assert_eq!(f.registry.lookup("alice"), Some(conn.id().clone()));
        assert_eq!(presence_frames(&mut rx), vec![vec!["alice".to_string()]]);
    }

    #[test]
    fn anonymous_connect_is_not_registered_and_not_broadcast() {
        let f = fixture();
        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::new("alice"), watch_tx);
        presence_frames(&mut watch_rx);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = f.handler.connect(&Handshake::anonymous(), tx);

        assert_eq!(conn.state(), &ConnectionState::Connecting);
        assert_eq!(f.registry.snapshot(), vec!["alice".to_string()]);
        assert!(presence_frames(&mut watch_rx).is_empty());
        assert!(presence_frames(&mut rx).is_empty());
        assert_eq!(f.sessions.len(), 2);
    }

    #[test]
    fn anonymous_session_still_hears_later_broadcasts() {
        let f = fixture();
        let (anon_tx, mut anon_rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::anonymous(), anon_tx);

        let (tx, _rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::new("bob"), tx);

        assert_eq!(presence_frames(&mut anon_rx), vec![vec!["bob".to_string()]]);
    }

    #[test]
    fn closing_anonymous_connection_has_no_registry_effect() {
        let f = fixture();
        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::new("alice"), watch_tx);
        presence_frames(&mut watch_rx);

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = f.handler.connect(&Handshake::anonymous(), tx);
        f.handler.disconnect(&mut conn);

        assert!(conn.is_closed());
        assert_eq!(f.registry.snapshot(), vec!["alice".to_string()]);
        assert!(presence_frames(&mut watch_rx).is_empty());
        assert_eq!(f.sessions.len(), 1);
    }

    #[test]
    fn disconnect_unregisters_and_broadcasts_once() {
        let f = fixture();
        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::anonymous(), watch_tx);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = f.handler.connect(&Handshake::new("alice"), tx);
        presence_frames(&mut watch_rx);

        f.handler.disconnect(&mut conn);

        assert!(conn.is_closed());
        assert!(f.registry.is_empty());
        assert_eq!(presence_frames(&mut watch_rx), vec![Vec::<String>::new()]);
    }

    #[test]
    fn double_disconnect_is_a_no_op() {
        let f = fixture();
        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::anonymous(), watch_tx);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = f.handler.connect(&Handshake::new("alice"), tx);

        f.handler.disconnect(&mut conn);
        presence_frames(&mut watch_rx);
        f.handler.disconnect(&mut conn);

        assert!(presence_frames(&mut watch_rx).is_empty());
    }

    #[test]
    fn stale_connection_closing_late_keeps_newer_connection_online() {
        let f = fixture();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();

        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
        f.handler.connect(&Handshake::anonymous(), watch_tx);

        let mut stale = f.handler.connect(&Handshake::new("alice"), old_tx);
        let fresh = f.handler.connect(&Handshake::new("alice"), new_tx);
        presence_frames(&mut watch_rx);
        f.handler.disconnect(&mut stale);

        assert_eq!(f.registry.lookup("alice"), Some(fresh.id().clone()));
        assert_eq!(f.sessions.len(), 2);
        assert!(presence_frames(&mut watch_rx).is_empty());
        assert!(stale.is_closed());
    }
}
