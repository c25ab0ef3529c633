//! Frame interpreter — folds inbound frames into an in-progress reply.
//!
//! One interpreter lives for the duration of a single exchange:
//! `AwaitingFirstFrame -> Accumulating -> Finalized`. Structured frames
//! replace the buffer wholesale (the backend sends the full answer once);
//! legacy fragments append. Nothing is processed after finalization.

use uniroad_protocol::{parse_frame, Frame};

use crate::fallback::NO_RESPONSE_REPLY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingFirstFrame,
    Accumulating,
    Finalized,
}

/// What the connection loop should do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Transient status line changed; surface it to the UI.
    Status(String),
    /// A terminal frame was observed; close the connection.
    RequestClose,
}

/// The finished reply of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReply {
    pub content: String,
    pub pending_id: Option<String>,
    pub cache_id: Option<String>,
}

pub struct FrameInterpreter {
    phase: Phase,
    buffer: String,
    status: Option<String>,
    pending_id: Option<String>,
    cache_id: Option<String>,
}

impl FrameInterpreter {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingFirstFrame,
            buffer: String::new(),
            status: None,
            pending_id: None,
            cache_id: None,
        }
    }

    #[allow(dead_code)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[allow(dead_code)]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Fold one raw inbound frame.
    pub fn on_frame(&mut self, raw: &str) -> Step {
        if self.phase == Phase::Finalized {
            return Step::Continue;
        }
        self.phase = Phase::Accumulating;

        match parse_frame(raw) {
            Frame::Status { label } => {
                self.status = Some(label.clone());
                Step::Status(label)
            }
            Frame::Answer {
                message,
                pending_id,
                cache_id,
            } => {
                // Full answer, not a delta: replace, never append.
                self.buffer = message;
                if pending_id.is_some() {
                    self.pending_id = pending_id;
                }
                if cache_id.is_some() {
                    self.cache_id = cache_id;
                }
                self.status = None;
                Step::Continue
            }
            Frame::Done => Step::RequestClose,
            Frame::LegacySentinel => Step::RequestClose,
            Frame::LegacyFragment(text) => {
                self.buffer.push_str(&text);
                Step::Continue
            }
        }
    }

    /// Finalize on connection close (normal or remote-initiated).
    ///
    /// An empty buffer is a valid completion and yields the fixed
    /// no-response placeholder.
    pub fn finalize(mut self) -> FinalReply {
        self.phase = Phase::Finalized;
        let content = if self.buffer.is_empty() {
            NO_RESPONSE_REPLY.to_string()
        } else {
            self.buffer
        };
        FinalReply {
            content,
            pending_id: self.pending_id,
            cache_id: self.cache_id,
        }
    }
}

impl Default for FrameInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_fragments_concatenate_until_sentinel() {
        let mut interp = FrameInterpreter::new();
        assert_eq!(interp.on_frame("Hel"), Step::Continue);
        assert_eq!(interp.on_frame("lo"), Step::Continue);
        assert_eq!(interp.on_frame("[STREAM_END]"), Step::RequestClose);
        assert_eq!(interp.finalize().content, "Hello");
    }

    #[test]
    fn structured_answer_replaces_not_appends() {
        let mut interp = FrameInterpreter::new();
        interp.on_frame(r#"{"type":"answer","message":"A"}"#);
        interp.on_frame(r#"{"type":"answer","message":"B"}"#);
        assert_eq!(interp.on_frame(r#"{"type":"done"}"#), Step::RequestClose);
        assert_eq!(interp.finalize().content, "B");
    }

    #[test]
    fn status_frames_do_not_touch_the_buffer() {
        let mut interp = FrameInterpreter::new();
        assert_eq!(interp.phase(), Phase::AwaitingFirstFrame);

        match interp.on_frame(r#"{"type":"searching"}"#) {
            Step::Status(label) => assert_eq!(label, "검색 중..."),
            other => panic!("unexpected step: {:?}", other),
        }
        assert_eq!(interp.phase(), Phase::Accumulating);
        assert_eq!(interp.status(), Some("검색 중..."));

        interp.on_frame(r#"{"type":"answer","message":"결과"}"#);
        // The answer clears the transient status.
        assert_eq!(interp.status(), None);
        assert_eq!(interp.finalize().content, "결과");
    }

    #[test]
    fn answer_captures_correlation_ids() {
        let mut interp = FrameInterpreter::new();
        interp.on_frame(r#"{"type":"answer","message":"네","pending_id":"p-9","cache_id":"c-9"}"#);
        let reply = interp.finalize();
        assert_eq!(reply.pending_id.as_deref(), Some("p-9"));
        assert_eq!(reply.cache_id.as_deref(), Some("c-9"));
    }

    #[test]
    fn empty_close_yields_placeholder() {
        let interp = FrameInterpreter::new();
        assert_eq!(interp.finalize().content, NO_RESPONSE_REPLY);
    }

    #[test]
    fn status_only_stream_yields_placeholder() {
        let mut interp = FrameInterpreter::new();
        interp.on_frame(r#"{"type":"thinking"}"#);
        interp.on_frame(r#"{"type":"done"}"#);
        assert_eq!(interp.finalize().content, NO_RESPONSE_REPLY);
    }

    #[test]
    fn mixed_protocols_in_one_stream() {
        // A structured answer followed by a stray legacy fragment: the
        // fragment appends to whatever is in the buffer.
        let mut interp = FrameInterpreter::new();
        interp.on_frame(r#"{"type":"answer","message":"본문"}"#);
        interp.on_frame(" 추가");
        assert_eq!(interp.finalize().content, "본문 추가");
    }
}
