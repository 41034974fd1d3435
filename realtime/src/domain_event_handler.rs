use crate::message::{Event, Notification};
use crate::notification::Delivery;
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to realtime events and pushing
/// them to the affected user's live connection.
///
/// The producer names the recipient in the event. This handler only decides
/// whether a push makes sense (nobody is notified about their own action) and
/// routes it.
pub struct RealtimeDomainEventHandler {
    manager: Arc<Manager>,
}

impl RealtimeDomainEventHandler {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }

    fn push(&self, user_id: &str, event: Event) -> Delivery {
        let delivery = self.manager.notify(user_id, &event);
        debug!("Realtime delivery to user {user_id}: {delivery:?}");
        delivery
    }
}

#[async_trait]
impl EventHandler for RealtimeDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::MessageSent {
                sender_id,
                receiver_id,
                message,
            } => {
                debug!("Handling MessageSent event from {sender_id} to {receiver_id}");
                self.push(receiver_id, Event::NewMessage(message.clone()));
            }

            DomainEvent::PostLiked {
                post_id,
                post_author_id,
                liked_by,
            } => {
                if liked_by == post_author_id {
                    return;
                }
                debug!("Handling PostLiked event for post {post_id}");
                self.push(
                    post_author_id,
                    Event::Notification(Notification::like(liked_by.clone(), post_id.clone())),
                );
            }

            DomainEvent::PostDisliked {
                post_id,
                post_author_id,
                disliked_by,
            } => {
                if disliked_by == post_author_id {
                    return;
                }
                debug!("Handling PostDisliked event for post {post_id}");
                self.push(
                    post_author_id,
                    Event::Notification(Notification::dislike(
                        disliked_by.clone(),
                        post_id.clone(),
                    )),
                );
            }
        }
    }
}
