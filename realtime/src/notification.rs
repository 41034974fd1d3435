use crate::connection::{ConnectionId, SessionTable};
use crate::message::{Event, EventType};
use crate::registry::ConnectionRegistry;
use log::*;
use std::sync::Arc;

/// Outcome of a point-to-point push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the user's live connection.
    Delivered(ConnectionId),
    /// The user has no registered connection. Nothing was sent.
    Offline,
    /// The user is registered but the session could not take the frame.
    Dropped,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered(_))
    }
}

/// Pushes events to a single user if, and only if, they are online right now.
///
/// Delivery is at-most-once and best-effort: no queueing, no retry. A user who
/// was offline sees the data on their next fetch through the REST API.
pub struct NotificationRouter {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionTable>,
}

impl NotificationRouter {
    pub fn new(registry: Arc<ConnectionRegistry>, sessions: Arc<SessionTable>) -> Self {
        Self { registry, sessions }
    }

    pub fn notify(&self, user_id: &str, event: &Event) -> Delivery {
        let Some(connection_id) = self.registry.lookup(user_id) else {
            debug!(
                "User {user_id} is offline, skipping {} event",
                event.event_type()
            );
            return Delivery::Offline;
        };

        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize {} event: {e}", event.event_type());
                return Delivery::Dropped;
            }
        };

        match self.sessions.send_to(&connection_id, frame) {
            Ok(()) => {
                debug!(
                    "Sent {} event to user {user_id} on connection {connection_id}",
                    event.event_type()
                );
                Delivery::Delivered(connection_id)
            }
            Err(e) => {
                warn!(
                    "Failed to send {} event to connection {}: {}",
                    event.event_type(),
                    connection_id,
                    e
                );
                Delivery::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Notification;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    fn setup() -> (Arc<ConnectionRegistry>, Arc<SessionTable>, NotificationRouter) {
        let registry = Arc::new(ConnectionRegistry::new());
        let sessions = Arc::new(SessionTable::new());
        let router = NotificationRouter::new(registry.clone(), sessions.clone());
        (registry, sessions, router)
    }

    #[test]
    fn online_user_receives_event_on_registered_connection() {
        let (registry, sessions, router) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new();
        sessions.attach(id.clone(), tx);
        registry.register("bob".into(), id.clone());

        let delivery = router.notify("bob", &Event::NewMessage(json!({ "message": "hi" })));

        assert_eq!(delivery, Delivery::Delivered(id));
        let value: Value = serde_json::from_str(rx.try_recv().unwrap().as_str()).unwrap();
        assert_eq!(value["event"], "newMessage");
        assert_eq!(value["data"]["message"], "hi");
    }

    #[test]
    fn offline_user_gets_no_push() {
        let (_registry, sessions, router) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        sessions.attach(ConnectionId::new(), tx);

        let delivery = router.notify(
            "bob",
            &Event::Notification(Notification::like("alice".into(), "p1".into())),
        );

        assert_eq!(delivery, Delivery::Offline);
        assert!(!delivery.is_delivered());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_session_is_reported_as_dropped() {
        let (registry, sessions, router) = setup();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new();
        sessions.attach(id.clone(), tx);
        registry.register("bob".into(), id);
        drop(rx);

        assert_eq!(
            router.notify("bob", &Event::NewMessage(json!({}))),
            Delivery::Dropped
        );
    }

    #[test]
    fn only_the_latest_connection_is_targeted() {
        let (registry, sessions, router) = setup();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        let old = ConnectionId::new();
        let new = ConnectionId::new();
        sessions.attach(old.clone(), old_tx);
        sessions.attach(new.clone(), new_tx);
        registry.register("bob".into(), old);
        registry.register("bob".into(), new.clone());

        assert_eq!(
            router.notify("bob", &Event::NewMessage(json!({}))),
            Delivery::Delivered(new)
        );
        assert!(old_rx.try_recv().is_err());
        assert!(new_rx.try_recv().is_ok());
    }
}
