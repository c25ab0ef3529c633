//! Advisory backend side effects: session summarization and feedback.
//!
//! Both are best-effort. A failed summarize leaves the session title as
//! the placeholder; a failed feedback POST loses the reaction. Neither
//! is surfaced to the user or retried.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use uniroad_protocol::{
    FeedbackKind, FeedbackRequest, SummarizeRequest, SummarizeResponse, WireMessage,
};

use crate::error::ApiError;
use crate::store::SessionStore;

#[derive(Clone)]
pub struct AdvisoryApi {
    http: reqwest::Client,
    base_url: String,
}

impl AdvisoryApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// POST `/summarize`, returning the generated session title.
    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(format!("{}/summarize", self.base_url))
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }

        let body: SummarizeResponse = resp.json().await?;
        Ok(body.summary)
    }

    /// POST `/feedback`, recording a reaction keyed on the assistant
    /// message's correlation id.
    pub async fn feedback(&self, correlation_id: &str, kind: FeedbackKind) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(format!("{}/feedback", self.base_url))
            .json(&FeedbackRequest {
                user_id: correlation_id.to_string(),
                kind,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Spawn a fire-and-forget task to summarize a completed exchange and
/// store the result as the session title.
pub fn spawn_summarize(
    api: AdvisoryApi,
    store: Arc<dyn SessionStore>,
    session_id: String,
    messages: Vec<WireMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if messages.is_empty() {
            return;
        }

        let request = SummarizeRequest {
            messages,
            session_id: session_id.clone(),
        };

        match api.summarize(&request).await {
            Ok(summary) => {
                info!(
                    component = "summarize",
                    session_id = %session_id,
                    summary = %summary,
                    "Session summarized"
                );
                if let Err(e) = store.set_summary(&session_id, &summary).await {
                    warn!(
                        component = "summarize",
                        session_id = %session_id,
                        error = %e,
                        "Failed to store session summary"
                    );
                }
            }
            Err(e) => {
                warn!(
                    component = "summarize",
                    session_id = %session_id,
                    error = %e,
                    "Summarize call failed"
                );
            }
        }
    })
}
