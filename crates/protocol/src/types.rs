//! Core types shared across the client

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

/// Feedback recorded against an assistant message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Like,
    Dislike,
}

/// A persisted conversation container owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    /// Human-readable title, populated asynchronously by the summarizer.
    pub summary: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One turn (user or assistant) within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub content: String,
    pub sender: Sender,
    pub created_at: i64,
    /// Correlation id returned by the backend, used for feedback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackKind>,
}

impl Message {
    /// Construct a user message at the moment of submission.
    pub fn user(session_id: &str, content: &str) -> Self {
        Self {
            id: crate::new_id(),
            session_id: session_id.to_string(),
            content: content.to_string(),
            sender: Sender::User,
            created_at: crate::now_millis(),
            pending_id: None,
            cache_id: None,
            feedback: None,
        }
    }

    /// Construct the single assistant message for a finished exchange.
    pub fn assistant(
        session_id: &str,
        content: &str,
        pending_id: Option<String>,
        cache_id: Option<String>,
    ) -> Self {
        Self {
            id: crate::new_id(),
            session_id: session_id.to_string(),
            content: content.to_string(),
            sender: Sender::Assistant,
            created_at: crate::now_millis(),
            pending_id,
            cache_id,
            feedback: None,
        }
    }

    /// The shape this message takes inside a chat or summarize request.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            id: self.id.clone(),
            content: self.content.clone(),
            sender: self.sender,
            timestamp: self.created_at,
        }
    }
}

/// A message as carried in outbound request payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: i64,
}

/// The single request sent over a fresh `/chat` connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    /// Trailing window of prior messages plus the new user message.
    pub messages: Vec<WireMessage>,
    pub user_id: Option<String>,
    /// Reserved; always empty in current clients.
    pub attachments: Vec<Value>,
    /// Opaque profile context used by the backend to personalize replies.
    pub profile: Option<Value>,
}

/// POST body for `/summarize`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub messages: Vec<WireMessage>,
    pub session_id: String,
}

/// Response from `/summarize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// POST body for `/feedback`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// The correlation id of the assistant message being rated.
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
}

/// Response from `/api/academic/upload-pdf`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Server-side processing state of an upload task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Response from `/task-status/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_uses_camel_case_keys() {
        let req = ChatRequest {
            session_id: "sess-1".to_string(),
            messages: vec![WireMessage {
                id: "m-1".to_string(),
                content: "안녕".to_string(),
                sender: Sender::User,
                timestamp: 1_700_000_000_000,
            }],
            user_id: Some("user-1".to_string()),
            attachments: vec![],
            profile: None,
        };

        let json: Value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["sessionId"], "sess-1");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["messages"][0]["sender"], "user");
        assert_eq!(json["messages"][0]["timestamp"], 1_700_000_000_000_i64);
        assert!(json["attachments"].as_array().unwrap().is_empty());
        assert!(json["profile"].is_null());
    }

    #[test]
    fn feedback_request_wire_shape() {
        let req = FeedbackRequest {
            user_id: "pend-42".to_string(),
            kind: FeedbackKind::Like,
        };
        let json: Value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["userId"], "pend-42");
        assert_eq!(json["type"], "like");
    }

    #[test]
    fn task_status_parses_with_missing_optionals() {
        let status: TaskStatus =
            serde_json::from_str(r#"{"status":"in_progress"}"#).expect("parse");
        assert_eq!(status.status, TaskState::InProgress);
        assert_eq!(status.progress, 0.0);
        assert!(status.error.is_none());
    }

    #[test]
    fn upload_response_roundtrip() {
        let json = r#"{"success":true,"total_records":12,"message":"ok","task_id":"t-1"}"#;
        let parsed: UploadResponse = serde_json::from_str(json).expect("parse");
        assert!(parsed.success);
        assert_eq!(parsed.total_records, Some(12));
        assert_eq!(parsed.task_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn message_constructors_set_sender_and_fresh_ids() {
        let user = Message::user("sess-1", "질문");
        let reply = Message::assistant("sess-1", "답변", Some("p-1".into()), None);
        assert_eq!(user.sender, Sender::User);
        assert_eq!(reply.sender, Sender::Assistant);
        assert_ne!(user.id, reply.id);
        assert_eq!(reply.pending_id.as_deref(), Some("p-1"));
        assert!(user.feedback.is_none());
    }
}
