//! Durable storage port and its SQLite implementation.
//!
//! The backend row store the screens talk to is re-expressed here as an
//! injected collaborator so the chat component has no ambient client.
//! Row inserts and session updates are re-broadcast to subscribers,
//! standing in for the realtime push channel: the same logical message a
//! caller just appended optimistically comes back through `subscribe()`.
//!
//! SQLite access runs on the blocking pool; a connection is opened per
//! operation with WAL and a busy timeout, matching the write-path setup
//! used at startup by the migration runner.

use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use uniroad_protocol::{new_id, now_millis, FeedbackKind, Message, Sender, Session};

use crate::error::StoreError;
use crate::migration_runner::run_migrations;

/// Pushed to subscribers after a successful write.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    MessageInserted(Message),
    SessionCreated(Session),
    SessionUpdated(Session),
}

/// Row-level storage for sessions, messages, and the profile blob.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, user_id: &str) -> Result<Session, StoreError>;

    /// Sessions for a user, most recently updated first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, StoreError>;

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Messages of a session ordered by creation timestamp.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError>;

    async fn set_summary(&self, session_id: &str, summary: &str) -> Result<(), StoreError>;

    async fn set_feedback(
        &self,
        message_id: &str,
        feedback: FeedbackKind,
    ) -> Result<(), StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Value>, StoreError>;

    async fn set_profile(&self, user_id: &str, data: &Value) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// SQLite-backed store at `~/.uniroad/uniroad.db`.
pub struct SqliteStore {
    db_path: PathBuf,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    /// Open the store, applying pending migrations.
    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Migration(e.to_string()))?;
        }

        let path = db_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = Connection::open(&path)?;
            run_migrations(&mut conn).map_err(|e| StoreError::Migration(e.to_string()))
        })
        .await??;

        info!(component = "store", db = %db_path.display(), "Store opened");

        let (events, _) = broadcast::channel(256);
        Ok(Self { db_path, events })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
            let conn = Connection::open(&path)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            op(&conn)
        })
        .await?
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine; nobody is on the chat screen.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, user_id: &str) -> Result<Session, StoreError> {
        let session = Session {
            id: new_id(),
            user_id: user_id.to_string(),
            summary: None,
            created_at: now_millis(),
            updated_at: now_millis(),
        };

        let row = session.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO chat_sessions (id, user_id, summary, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.user_id, row.summary, row.created_at, row.updated_at],
            )?;
            Ok(())
        })
        .await?;

        debug!(component = "store", session_id = %session.id, "Session created");
        self.emit(StoreEvent::SessionCreated(session.clone()));
        Ok(session)
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let user = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, summary, created_at, updated_at
                 FROM chat_sessions WHERE user_id = ?1
                 ORDER BY updated_at DESC",
            )?;
            let rows = stmt
                .query_map(params![user], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let row = message.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO chat_messages
                 (id, session_id, content, sender, created_at, pending_id, cache_id, feedback)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.session_id,
                    row.content,
                    row.sender.as_str(),
                    row.created_at,
                    row.pending_id,
                    row.cache_id,
                    row.feedback.map(feedback_str),
                ],
            )?;
            conn.execute(
                "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
                params![row.created_at, row.session_id],
            )?;
            Ok(())
        })
        .await?;

        self.emit(StoreEvent::MessageInserted(message.clone()));
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        let session = session_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, content, sender, created_at, pending_id, cache_id, feedback
                 FROM chat_messages WHERE session_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map(params![session], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn set_summary(&self, session_id: &str, summary: &str) -> Result<(), StoreError> {
        let id = session_id.to_string();
        let title = summary.to_string();
        let session = self
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE chat_sessions SET summary = ?1, updated_at = ?2 WHERE id = ?3",
                    params![title, now_millis(), id],
                )?;
                let session = conn
                    .query_row(
                        "SELECT id, user_id, summary, created_at, updated_at
                         FROM chat_sessions WHERE id = ?1",
                        params![id],
                        row_to_session,
                    )
                    .optional()?;
                session.ok_or(StoreError::NotFound(id))
            })
            .await?;

        self.emit(StoreEvent::SessionUpdated(session));
        Ok(())
    }

    async fn set_feedback(
        &self,
        message_id: &str,
        feedback: FeedbackKind,
    ) -> Result<(), StoreError> {
        let id = message_id.to_string();
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE chat_messages SET feedback = ?1 WHERE id = ?2",
                params![feedback_str(feedback), id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Value>, StoreError> {
        let id = user_id.to_string();
        self.with_conn(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT data FROM user_profile WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
        })
        .await
    }

    async fn set_profile(&self, user_id: &str, data: &Value) -> Result<(), StoreError> {
        let id = user_id.to_string();
        let raw = data.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO user_profile (id, data) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                params![id, raw],
            )?;
            Ok(())
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

fn feedback_str(kind: FeedbackKind) -> &'static str {
    match kind {
        FeedbackKind::Like => "like",
        FeedbackKind::Dislike => "dislike",
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        summary: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let sender: String = row.get(3)?;
    let feedback: Option<String> = row.get(7)?;
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        content: row.get(2)?,
        sender: if sender == "user" {
            Sender::User
        } else {
            Sender::Assistant
        },
        created_at: row.get(4)?,
        pending_id: row.get(5)?,
        cache_id: row.get(6)?,
        feedback: feedback.and_then(|s| match s.as_str() {
            "like" => Some(FeedbackKind::Like),
            "dislike" => Some(FeedbackKind::Dislike),
            _ => None,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::open(dir.path().join("test.db"))
            .await
            .expect("open store");
        (store, dir)
    }

    #[tokio::test]
    async fn session_roundtrip_and_ordering() {
        let (store, _dir) = open_store().await;

        let first = store.create_session("user-1").await.expect("create");
        let second = store.create_session("user-1").await.expect("create");
        store.create_session("other").await.expect("create");

        // Touch the first session so it becomes the most recent.
        let msg = Message::user(&first.id, "안녕");
        store.insert_message(&msg).await.expect("insert");

        let sessions = store.list_sessions("user-1").await.expect("list");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, first.id);
        assert_eq!(sessions[1].id, second.id);
    }

    #[tokio::test]
    async fn message_roundtrip_preserves_correlation_ids() {
        let (store, _dir) = open_store().await;
        let session = store.create_session("user-1").await.expect("create");

        let reply = Message::assistant(
            &session.id,
            "반갑습니다",
            Some("p-1".to_string()),
            Some("c-1".to_string()),
        );
        store.insert_message(&reply).await.expect("insert");

        let messages = store.list_messages(&session.id).await.expect("list");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "반갑습니다");
        assert_eq!(messages[0].pending_id.as_deref(), Some("p-1"));
        assert_eq!(messages[0].cache_id.as_deref(), Some("c-1"));
        assert_eq!(messages[0].sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn insert_is_pushed_to_subscribers() {
        let (store, _dir) = open_store().await;
        let session = store.create_session("user-1").await.expect("create");

        let mut events = store.subscribe();
        let msg = Message::user(&session.id, "질문");
        store.insert_message(&msg).await.expect("insert");

        match events.recv().await.expect("event") {
            StoreEvent::MessageInserted(pushed) => assert_eq!(pushed.id, msg.id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn summary_update_bumps_session_and_notifies() {
        let (store, _dir) = open_store().await;
        let session = store.create_session("user-1").await.expect("create");

        let mut events = store.subscribe();
        store
            .set_summary(&session.id, "전공 상담")
            .await
            .expect("set summary");

        let sessions = store.list_sessions("user-1").await.expect("list");
        assert_eq!(sessions[0].summary.as_deref(), Some("전공 상담"));

        match events.recv().await.expect("event") {
            StoreEvent::SessionUpdated(updated) => {
                assert_eq!(updated.summary.as_deref(), Some("전공 상담"))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn feedback_persists_and_missing_message_errors() {
        let (store, _dir) = open_store().await;
        let session = store.create_session("user-1").await.expect("create");
        let reply = Message::assistant(&session.id, "답변", None, None);
        store.insert_message(&reply).await.expect("insert");

        store
            .set_feedback(&reply.id, FeedbackKind::Like)
            .await
            .expect("set feedback");
        let messages = store.list_messages(&session.id).await.expect("list");
        assert_eq!(messages[0].feedback, Some(FeedbackKind::Like));

        let err = store
            .set_feedback("missing", FeedbackKind::Dislike)
            .await
            .expect_err("missing row");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn profile_roundtrip() {
        let (store, _dir) = open_store().await;
        assert!(store.get_profile("user-1").await.expect("get").is_none());

        let data = serde_json::json!({"hope_major": "컴퓨터공학"});
        store.set_profile("user-1", &data).await.expect("set");
        let loaded = store.get_profile("user-1").await.expect("get");
        assert_eq!(loaded, Some(data));
    }
}
