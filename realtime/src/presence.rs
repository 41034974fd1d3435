use crate::connection::SessionTable;
use crate::message::Event;
use crate::registry::ConnectionRegistry;
use log::*;
use std::sync::Arc;

/// Announces the current online-user set to every open session.
///
/// Every call is a full fan-out of the complete set; there is no delta
/// encoding or coalescing, so each connect/disconnect costs O(sessions).
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, sessions: Arc<SessionTable>) -> Self {
        Self { registry, sessions }
    }

    /// Push `getOnlineUsers` with the registry snapshot to all sessions, bound
    /// or not. Returns the number of sessions that accepted the frame.
    pub fn broadcast_online_users(&self) -> usize {
        let online = self.registry.snapshot();
        let online_count = online.len();

        let frame = match Event::OnlineUsers(online).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize presence event: {e}");
                return 0;
            }
        };

        let delivered = self.sessions.broadcast(&frame);
        debug!(
            "Broadcast {} online user(s) to {}/{} session(s)",
            online_count,
            delivered,
            self.sessions.len()
        );
        delivered
    }
}
