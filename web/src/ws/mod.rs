//! WebSocket transport for the realtime layer.
//!
//! This module contains only the upgrade handler and the per-connection task.
//! Presence and routing state lives in the `realtime` crate.

pub mod handler;
