//! Chat session component — one conversation, one exchange at a time.
//!
//! Owns the local message list and the single open-exchange slot. A
//! submission appends the user message optimistically, initiates its
//! durable write, and spawns one transport exchange; the exchange
//! reports back over a channel and the owning loop feeds events into
//! `on_exchange_event`. Every submission ends with exactly one persisted
//! assistant message: the real reply, the no-response placeholder, or a
//! fallback when the transport fails.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use uniroad_protocol::{ChatRequest, FeedbackKind, Message, WireMessage};

use crate::error::{SendError, StoreError, TransportError};
use crate::fallback::{canned_reply, SERVICE_UNAVAILABLE_REPLY};
use crate::interpreter::FinalReply;
use crate::resolver::SessionResolver;
use crate::store::{SessionStore, StoreEvent};
use crate::stream::StreamTransport;
use crate::summarize::{spawn_summarize, AdvisoryApi};

/// Trailing window of prior messages sent with each request.
pub const HISTORY_WINDOW: usize = 10;

/// Events reported by the in-flight exchange task.
#[derive(Debug)]
pub enum ExchangeEvent {
    Status(String),
    Finished(FinalReply),
    Failed(TransportError),
}

/// What the UI should repaint after an event.
#[derive(Debug, Clone)]
pub enum DisplayUpdate {
    Status(String),
    Reply(Message),
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Started,
    /// An exchange is already open; the submission was dropped.
    Busy,
    /// Blank input; nothing to send.
    Empty,
}

/// In-flight state of one request/response cycle.
struct OpenExchange {
    user_text: String,
    status: Option<String>,
    driver: JoinHandle<()>,
}

pub struct ChatSession {
    user_id: String,
    resolver: SessionResolver,
    profile: Option<Value>,
    messages: Vec<Message>,
    exchange: Option<OpenExchange>,
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn StreamTransport>,
    api: AdvisoryApi,
    canned_fallback: bool,
    events_tx: mpsc::Sender<ExchangeEvent>,
}

impl ChatSession {
    /// Build a session component. The returned receiver delivers
    /// exchange events; feed them back through `on_exchange_event`.
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn StreamTransport>,
        api: AdvisoryApi,
        user_id: &str,
        profile: Option<Value>,
        canned_fallback: bool,
    ) -> (Self, mpsc::Receiver<ExchangeEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        (
            Self {
                user_id: user_id.to_string(),
                resolver: SessionResolver::new(user_id),
                profile,
                messages: Vec::new(),
                exchange: None,
                store,
                transport,
                api,
                canned_fallback,
                events_tx,
            },
            events_rx,
        )
    }

    /// Switch to an existing session and load its history.
    pub async fn adopt_session(&mut self, session_id: String) -> Result<(), StoreError> {
        self.resolver.adopt(session_id.clone());
        self.messages = self.store.list_messages(&session_id).await?;
        Ok(())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.resolver.active()
    }

    pub fn is_streaming(&self) -> bool {
        self.exchange.is_some()
    }

    /// Current transient status line, if the backend reported one.
    pub fn status_line(&self) -> Option<&str> {
        self.exchange.as_ref().and_then(|ex| ex.status.as_deref())
    }

    /// Local message list in display order (creation timestamp, not
    /// arrival order — optimistic appends and store echoes interleave).
    pub fn messages_for_display(&self) -> Vec<Message> {
        let mut messages = self.messages.clone();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    /// Submit user input.
    ///
    /// While an exchange is open the submission is dropped, not queued.
    /// Session creation failure aborts before any stream is opened.
    pub async fn send_message(&mut self, text: &str) -> Result<SendOutcome, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Empty);
        }
        if self.exchange.is_some() {
            debug!(component = "chat", "Exchange open, submission dropped");
            return Ok(SendOutcome::Busy);
        }

        let session_id = self
            .resolver
            .resolve(self.store.as_ref())
            .await
            .map_err(SendError::SessionCreate)?;

        // Trailing window, computed before the optimistic append.
        let mut window: Vec<WireMessage> = self
            .messages
            .iter()
            .rev()
            .take(HISTORY_WINDOW)
            .map(Message::to_wire)
            .collect();
        window.reverse();

        let user_msg = Message::user(&session_id, text);
        window.push(user_msg.to_wire());
        self.messages.push(user_msg.clone());

        // Durable write of the user message: initiated now, not awaited
        // before the connection attempt starts.
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.insert_message(&user_msg).await {
                warn!(
                    component = "chat",
                    message_id = %user_msg.id,
                    error = %e,
                    "Failed to persist user message"
                );
            }
        });

        let request = ChatRequest {
            session_id,
            messages: window,
            user_id: Some(self.user_id.clone()),
            attachments: vec![],
            profile: self.profile.clone(),
        };

        let transport = Arc::clone(&self.transport);
        let events_tx = self.events_tx.clone();
        let driver = tokio::spawn(async move {
            let (status_tx, mut status_rx) = mpsc::channel(16);

            let forward_tx = events_tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(label) = status_rx.recv().await {
                    let _ = forward_tx.send(ExchangeEvent::Status(label)).await;
                }
            });

            let result = transport.run(request, status_tx).await;
            let _ = forwarder.await;
            let _ = match result {
                Ok(reply) => events_tx.send(ExchangeEvent::Finished(reply)).await,
                Err(e) => events_tx.send(ExchangeEvent::Failed(e)).await,
            };
        });

        self.exchange = Some(OpenExchange {
            user_text: text.to_string(),
            status: None,
            driver,
        });
        Ok(SendOutcome::Started)
    }

    /// Fold one exchange event into the session state.
    pub async fn on_exchange_event(&mut self, event: ExchangeEvent) -> Option<DisplayUpdate> {
        match event {
            ExchangeEvent::Status(label) => {
                let exchange = self.exchange.as_mut()?;
                exchange.status = Some(label.clone());
                Some(DisplayUpdate::Status(label))
            }
            ExchangeEvent::Finished(reply) => {
                self.commit_reply(reply.content, reply.pending_id, reply.cache_id, true)
                    .await
            }
            ExchangeEvent::Failed(e) => {
                warn!(component = "chat", error = %e, "Exchange failed, substituting fallback");
                let content = match &self.exchange {
                    Some(exchange) if self.canned_fallback => canned_reply(&exchange.user_text),
                    _ => SERVICE_UNAVAILABLE_REPLY.to_string(),
                };
                self.commit_reply(content, None, None, false).await
            }
        }
    }

    /// Persist and append the single assistant message for the open
    /// exchange, then kick off summarization for completed streams.
    async fn commit_reply(
        &mut self,
        content: String,
        pending_id: Option<String>,
        cache_id: Option<String>,
        summarize: bool,
    ) -> Option<DisplayUpdate> {
        // A stale event after close() has nothing to commit.
        let _exchange = self.exchange.take()?;
        let session_id = self.resolver.active()?.to_string();

        let reply = Message::assistant(&session_id, &content, pending_id, cache_id);
        if let Err(e) = self.store.insert_message(&reply).await {
            warn!(
                component = "chat",
                message_id = %reply.id,
                error = %e,
                "Failed to persist assistant message"
            );
        }
        self.messages.push(reply.clone());

        if summarize {
            let wires = self.messages_for_display().iter().map(Message::to_wire).collect();
            spawn_summarize(
                self.api.clone(),
                Arc::clone(&self.store),
                session_id,
                wires,
            );
        }

        Some(DisplayUpdate::Reply(reply))
    }

    /// Fold a realtime store push. The optimistic copy and the store
    /// echo carry the same id, so de-duplication is by id only.
    pub fn apply_store_event(&mut self, event: StoreEvent) -> Option<Message> {
        let StoreEvent::MessageInserted(message) = event else {
            return None;
        };
        if self.resolver.active() != Some(message.session_id.as_str()) {
            return None;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return None;
        }
        self.messages.push(message.clone());
        Some(message)
    }

    /// Record a like/dislike on an assistant message: persist locally,
    /// POST to the backend fire-and-forget.
    pub async fn send_feedback(
        &mut self,
        message_id: &str,
        kind: FeedbackKind,
    ) -> Result<(), StoreError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(message_id.to_string()))?;
        message.feedback = Some(kind);

        // The backend keys feedback on the correlation id when present.
        let correlation = message
            .pending_id
            .clone()
            .unwrap_or_else(|| message_id.to_string());

        self.store.set_feedback(message_id, kind).await?;

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.feedback(&correlation, kind).await {
                warn!(component = "chat", error = %e, "Feedback call failed");
            }
        });
        Ok(())
    }

    /// Tear down any open exchange. Aborting the driver drops the
    /// socket, closing the connection.
    pub fn close(&mut self) {
        if let Some(exchange) = self.exchange.take() {
            exchange.driver.abort();
            debug!(component = "chat", "Open exchange aborted");
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}
