//! School-record upload and task-status polling.
//!
//! These are idempotent-safe discrete requests, so unlike the chat
//! stream they retry: uploads up to 3 attempts with a doubling delay
//! capped at 5 seconds, status polls up to 40 attempts capped at 10
//! seconds. Polling continues through transient errors until the task
//! completes, fails, or the attempt ceiling is reached.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart;
use tracing::{debug, info, warn};

use uniroad_protocol::{TaskState, TaskStatus, UploadResponse};

use crate::error::AcademicError;

pub const UPLOAD_MAX_RETRIES: u32 = 3;
pub const POLL_MAX_ATTEMPTS: u32 = 40;

const UPLOAD_DELAY_CAP: Duration = Duration::from_secs(5);
const POLL_DELAY_CAP: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AcademicClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl AcademicClient {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Single upload attempt of a school-record PDF.
    pub async fn upload_school_record(
        &self,
        path: &Path,
        user_email: &str,
    ) -> Result<UploadResponse, AcademicError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "school_record.pdf".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("user_email", user_email.to_string());

        let resp = self
            .authorize(
                self.http
                    .post(format!("{}/api/academic/upload-pdf", self.base_url)),
            )
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AcademicError::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Upload with capped exponential backoff.
    pub async fn upload_with_retry(
        &self,
        path: &Path,
        user_email: &str,
    ) -> Result<UploadResponse, AcademicError> {
        let mut last_error = None;

        for attempt in 1..=UPLOAD_MAX_RETRIES {
            match self.upload_school_record(path, user_email).await {
                Ok(resp) => {
                    info!(
                        component = "academic",
                        attempt = attempt,
                        total_records = ?resp.total_records,
                        "Upload accepted"
                    );
                    return Ok(resp);
                }
                Err(e) => {
                    warn!(
                        component = "academic",
                        attempt = attempt,
                        error = %e,
                        "Upload attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < UPLOAD_MAX_RETRIES {
                        tokio::time::sleep(upload_delay(attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AcademicError::Timeout))
    }

    pub async fn check_task_status(&self, task_id: &str) -> Result<TaskStatus, AcademicError> {
        let resp = self
            .authorize(
                self.http
                    .get(format!("{}/task-status/{}", self.base_url, task_id)),
            )
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AcademicError::StatusRejected(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }

    /// Poll until the task completes or fails, with capped backoff.
    /// Transient errors count as attempts and do not abort the poll.
    pub async fn poll_task_status(
        &self,
        task_id: &str,
        mut on_progress: impl FnMut(&TaskStatus) + Send,
    ) -> Result<TaskStatus, AcademicError> {
        let mut attempt = 0;

        while attempt < POLL_MAX_ATTEMPTS {
            match self.check_task_status(task_id).await {
                Ok(status) => {
                    on_progress(&status);
                    match status.status {
                        TaskState::Completed => return Ok(status),
                        TaskState::Failed => {
                            return Err(AcademicError::TaskFailed(
                                status
                                    .error
                                    .unwrap_or_else(|| "처리 중 오류가 발생했습니다.".to_string()),
                            ))
                        }
                        TaskState::Pending | TaskState::InProgress => {
                            debug!(
                                component = "academic",
                                task_id = %task_id,
                                step = %status.current_step,
                                progress = status.progress,
                                "Task still running"
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        component = "academic",
                        task_id = %task_id,
                        attempt = attempt,
                        error = %e,
                        "Status poll failed"
                    );
                    if attempt >= POLL_MAX_ATTEMPTS - 1 {
                        return Err(e);
                    }
                }
            }

            tokio::time::sleep(poll_delay(attempt)).await;
            attempt += 1;
        }

        Err(AcademicError::Timeout)
    }
}

/// Delay before upload retry `attempt` (1-based): 1s, 2s, 4s, capped at 5s.
fn upload_delay(attempt: u32) -> Duration {
    let delay = Duration::from_secs(1 << (attempt - 1).min(8));
    delay.min(UPLOAD_DELAY_CAP)
}

/// Delay after poll `attempt` (0-based): 1s, 2s, 4s, 8s, capped at 10s.
fn poll_delay(attempt: u32) -> Duration {
    let delay = Duration::from_secs(1 << attempt.min(8));
    delay.min(POLL_DELAY_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_backoff_doubles_to_cap() {
        assert_eq!(upload_delay(1), Duration::from_secs(1));
        assert_eq!(upload_delay(2), Duration::from_secs(2));
        assert_eq!(upload_delay(3), Duration::from_secs(4));
        assert_eq!(upload_delay(4), Duration::from_secs(5));
        assert_eq!(upload_delay(10), Duration::from_secs(5));
    }

    #[test]
    fn poll_backoff_doubles_to_cap() {
        assert_eq!(poll_delay(0), Duration::from_secs(1));
        assert_eq!(poll_delay(1), Duration::from_secs(2));
        assert_eq!(poll_delay(2), Duration::from_secs(4));
        assert_eq!(poll_delay(3), Duration::from_secs(8));
        assert_eq!(poll_delay(4), Duration::from_secs(10));
        assert_eq!(poll_delay(39), Duration::from_secs(10));
    }
}
