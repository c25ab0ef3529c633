//! Inbound stream frames.
//!
//! The chat backend speaks two generations of the same protocol. The
//! current one sends JSON objects tagged with a `type` field; the legacy
//! one sends plain text fragments terminated by a sentinel string.
//! `parse_frame` normalizes both into one tagged variant so the
//! interpreter can be driven frame-by-frame.

use serde::Deserialize;

/// Legacy-protocol terminal sentinel.
pub const STREAM_END: &str = "[STREAM_END]";

/// One decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Transient progress indicator ("thinking", "searching", ...).
    Status { label: String },
    /// The full answer text. Sent once, not as incremental deltas.
    Answer {
        message: String,
        pending_id: Option<String>,
        cache_id: Option<String>,
    },
    /// Structured-protocol terminal frame.
    Done,
    /// Legacy incremental text fragment.
    LegacyFragment(String),
    /// Legacy terminal sentinel (`[STREAM_END]`).
    LegacySentinel,
}

/// Raw structured frame as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFrame {
    Thinking { message: Option<String> },
    Searching { message: Option<String> },
    Generating { message: Option<String> },
    Answer {
        message: String,
        pending_id: Option<String>,
        cache_id: Option<String>,
    },
    Done,
}

/// Decode one inbound frame.
///
/// Structured parsing is always attempted first; only a parse failure
/// falls back to legacy interpretation.
pub fn parse_frame(raw: &str) -> Frame {
    if let Ok(wire) = serde_json::from_str::<WireFrame>(raw) {
        return match wire {
            WireFrame::Thinking { message } => Frame::Status {
                label: message.unwrap_or_else(|| "생각 중...".to_string()),
            },
            WireFrame::Searching { message } => Frame::Status {
                label: message.unwrap_or_else(|| "검색 중...".to_string()),
            },
            WireFrame::Generating { message } => Frame::Status {
                label: message.unwrap_or_else(|| "답변 작성 중...".to_string()),
            },
            WireFrame::Answer {
                message,
                pending_id,
                cache_id,
            } => Frame::Answer {
                message,
                pending_id,
                cache_id,
            },
            WireFrame::Done => Frame::Done,
        };
    }

    if raw == STREAM_END {
        Frame::LegacySentinel
    } else {
        Frame::LegacyFragment(raw.to_string())
    }
}
