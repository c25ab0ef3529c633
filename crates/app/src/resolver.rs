//! Session resolution.
//!
//! A conversation gets its durable session row lazily, on the first
//! outbound message, not on screen entry. Once created (or adopted from
//! the session list) the id stays active for the rest of the UI lifetime.

use tracing::info;

use uniroad_protocol::Session;

use crate::error::StoreError;
use crate::store::SessionStore;

pub struct SessionResolver {
    user_id: String,
    active: Option<String>,
}

impl SessionResolver {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            active: None,
        }
    }

    /// Adopt an existing session id (picked from the session list).
    /// No existence check is performed; a stale id surfaces as a
    /// backend error on first use.
    pub fn adopt(&mut self, session_id: String) {
        self.active = Some(session_id);
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Return the active session id, creating one on first use.
    ///
    /// A creation failure leaves the resolver unchanged so the send
    /// aborts before any stream is opened.
    pub async fn resolve(&mut self, store: &dyn SessionStore) -> Result<String, StoreError> {
        if let Some(id) = &self.active {
            return Ok(id.clone());
        }

        let session: Session = store.create_session(&self.user_id).await?;
        info!(
            component = "resolver",
            session_id = %session.id,
            "Created session for first message"
        );
        self.active = Some(session.id.clone());
        Ok(session.id)
    }
}
