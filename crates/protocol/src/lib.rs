//! Uniroad Protocol
//!
//! Shared types for the advisory chat client: persisted session/message
//! rows, the outbound chat request, and inbound stream frames.
//! Wire shapes are serialized as JSON.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

pub mod frame;
pub mod types;

pub use frame::{parse_frame, Frame, STREAM_END};
pub use types::*;

/// Generate a new unique ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time as unix milliseconds.
///
/// Message ordering is defined by this value, not insertion order.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
