//! Event system infrastructure for the presence platform.
//!
//! This crate provides the event system that decouples the request/response
//! side of the application (messages, likes, follows) from real-time
//! infrastructure concerns (pushing notifications over live connections).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing the business events that have a real-time audience
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates. Documents owned by the
//! external store are carried as serialized JSON values.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Stable identifier of an account, as issued by the external user store.
pub type UserId = String;

/// Domain events that represent business-level changes in the system.
/// These events are emitted after the owning store has accepted the change.
///
/// Each event names the user who should hear about it in real time. Whether
/// that user is actually online is decided by the handler, not the producer.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A direct message was stored.
    /// Pushed to the receiver as a `newMessage` event if they are online.
    MessageSent {
        sender_id: UserId,
        receiver_id: UserId,
        /// Complete serialized message document (id, senderId, reciverId, message, timestamps).
        message: Value,
    },
    /// A user liked a post.
    /// Pushed to the post author as a `notification` event unless they liked their own post.
    PostLiked {
        post_id: String,
        post_author_id: UserId,
        liked_by: UserId,
    },
    /// A user removed their like from a post.
    PostDisliked {
        post_id: String,
        post_author_id: UserId,
        disliked_by: UserId,
    },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers, in registration order.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
