//! Presence and real-time notification infrastructure.
//!
//! This crate tracks which users currently hold a live connection, tells every
//! connected client when that set changes, and pushes point-to-point events
//! (new direct messages, likes) to users who are online. It is transport
//! agnostic: outbound events are encoded as JSON text [`message::Frame`]s and
//! handed to an unbounded channel per session, which the web layer drains into
//! its WebSocket.
//!
//! # Architecture
//!
//! - **Last-registered-wins presence**: a user maps to at most one connection.
//!   A reconnect overwrites the stale mapping left by a dropped connection.
//! - **Split indices**: `ConnectionRegistry` answers "is this user online and
//!   where", `SessionTable` holds every open session (bound or anonymous) as
//!   the broadcast audience.
//! - **Full-set broadcasts**: every bind/unbind pushes the complete online set
//!   as a `getOnlineUsers` event. O(sessions) per change.
//! - **Ephemeral delivery**: if a user is offline they miss the event and see
//!   fresh data on their next REST fetch. Nothing is queued or retried.
//!
//! # Connection Flow
//!
//! 1. Client opens the socket with `?userId=<id>`
//! 2. `ConnectionLifecycleHandler` attaches the session and, if the id is
//!    usable, registers it and broadcasts presence
//! 3. Domain code publishes `events::DomainEvent`s; `RealtimeDomainEventHandler`
//!    routes them through `NotificationRouter`
//! 4. On transport close the lifecycle handler unregisters and broadcasts again
//!
//! # Example: pushing an event
//!
//! ```rust,ignore
//! use realtime::message::Event;
//!
//! let delivery = app_state.realtime.notify(&receiver_id, &Event::NewMessage(doc));
//! ```

pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod message;
pub mod notification;
pub mod presence;
pub mod registry;

pub use domain_event_handler::RealtimeDomainEventHandler;
pub use manager::Manager;
