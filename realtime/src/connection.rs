use crate::error::{Error, Result};
use crate::message::Frame;
use dashmap::DashMap;
use log::*;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

// Type alias for user IDs (opaque strings issued by the external user store)
pub type UserId = String;

/// Outbound half of one transport session.
pub type FrameSender = UnboundedSender<Frame>;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Every open transport session, bound to a user or not, keyed by connection id.
///
/// This is the fan-out target list for presence broadcasts and the delivery
/// handle for point-to-point pushes. Membership here says nothing about
/// presence; that lives in [`crate::registry::ConnectionRegistry`].
pub struct SessionTable {
    sessions: DashMap<ConnectionId, FrameSender>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Track a new session - O(1)
    pub fn attach(&self, connection_id: ConnectionId, sender: FrameSender) {
        self.sessions.insert(connection_id, sender);
    }

    /// Stop tracking a session. Returns false if it was already detached.
    pub fn detach(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.remove(connection_id).is_some()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Send a frame to one session - O(1)
    pub fn send_to(&self, connection_id: &ConnectionId, frame: Frame) -> Result<()> {
        let session = self.sessions.get(connection_id).ok_or_else(Error::transport)?;
        session.send(frame)?;
        Ok(())
    }

    /// Send a frame to every session - O(n). A closed session is logged and
    /// skipped. Returns how many sessions accepted the frame.
    pub fn broadcast(&self, frame: &Frame) -> usize {
        let mut delivered = 0;
        for entry in self.sessions.iter() {
            match entry.value().send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to send broadcast to connection {}: {}",
                    entry.key().as_str(),
                    e
                ),
            }
        }
        delivered
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
