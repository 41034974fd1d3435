use crate::connection::UserId;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Trait for getting the wire event name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Server-to-client events.
///
/// Serialized as `{"event": "<name>", "data": <payload>}` text frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    /// Full presence set, sent to every open session on each bind/unbind.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<UserId>),

    /// A direct message addressed to the receiving user.
    #[serde(rename = "newMessage")]
    NewMessage(Value),

    /// Activity on one of the receiving user's posts.
    #[serde(rename = "notification")]
    Notification(Notification),
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::OnlineUsers(_) => "getOnlineUsers",
            Event::NewMessage(_) => "newMessage",
            Event::Notification(_) => "notification",
        }
    }
}

impl Event {
    /// Encode as the JSON text carried by one transport frame.
    pub fn to_frame(&self) -> Result<Frame> {
        Ok(Frame(serde_json::to_string(self)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Dislike,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// The user who acted on the post.
    pub user_id: UserId,
    pub post_id: String,
    pub message: String,
}

impl Notification {
    pub fn like(user_id: UserId, post_id: String) -> Self {
        Self {
            kind: NotificationKind::Like,
            user_id,
            post_id,
            message: "Your post was liked".to_string(),
        }
    }

    pub fn dislike(user_id: UserId, post_id: String) -> Self {
        Self {
            kind: NotificationKind::Dislike,
            user_id,
            post_id,
            message: "Your post was disliked".to_string(),
        }
    }
}

/// One encoded outbound frame. Cheap to clone for fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
