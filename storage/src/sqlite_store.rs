//! SQLite-backed message store.
//!
//! Persists the append-only message log and serves the range, inbox, and
//! unread-count queries. Every durable write publishes a row-change event
//! through the shared [`PushRouter`]; subscriptions are served from the same
//! router, so readers and writers observe one event stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dchat_core::{
    EventFilter, EventKind, Message, MessageEvent, MessageStore, MessagingError, PushRouter,
    Subscription, SubscriptionError, WriteError,
};
use tracing::info;
use uuid::Uuid;

use crate::sqlite_pool::SqlitePoolManager;

/// Row shape of the `messages` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MessageRow {
    id: String,
    sender_id: String,
    receiver_id: String,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool_manager: SqlitePoolManager,
    router: PushRouter,
}

impl SqliteMessageStore {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let store = Self {
            pool_manager,
            router: PushRouter::new(),
        };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), sqlx::Error> {
        info!("Creating database tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                content TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_messages_receiver_unread ON messages(receiver_id, is_read)",
            "CREATE INDEX IF NOT EXISTS idx_messages_sender_receiver ON messages(sender_id, receiver_id)",
            "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at)",
        ] {
            sqlx::query(index).execute(pool).await?;
        }

        Ok(())
    }

    /// The event router this store publishes into.
    pub fn router(&self) -> &PushRouter {
        &self.router
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<Message, WriteError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(WriteError::EmptyContent);
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.content)
        .bind(message.is_read)
        .bind(message.created_at)
        .execute(self.pool_manager.pool())
        .await
        .map_err(|e| WriteError::Unavailable(e.to_string()))?;

        info!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "Appended message"
        );

        self.router
            .publish(&MessageEvent {
                kind: EventKind::Created,
                message: message.clone(),
            })
            .await;

        Ok(message)
    }

    async fn fetch_range(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_all(self.pool_manager.pool())
        .await
        .map_err(|e| MessagingError::Load(e.to_string()))?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn fetch_inbox_log(&self, user_id: &str) -> Result<Vec<Message>, MessagingError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE sender_id = ? OR receiver_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool_manager.pool())
        .await
        .map_err(|e| MessagingError::Load(e.to_string()))?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, WriteError> {
        let pool = self.pool_manager.pool();

        // Capture the unread set first: rows appended after this point must
        // not be flipped by this call.
        let unread: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE sender_id = ? AND receiver_id = ? AND is_read = 0
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_all(pool)
        .await
        .map_err(|e| WriteError::Unavailable(e.to_string()))?;

        if unread.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; unread.len()].join(", ");
        let sql = format!(
            "UPDATE messages SET is_read = 1 WHERE is_read = 0 AND id IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for row in &unread {
            query = query.bind(&row.id);
        }
        let result = query
            .execute(pool)
            .await
            .map_err(|e| WriteError::Unavailable(e.to_string()))?;

        info!(
            sender_id = %sender_id,
            receiver_id = %receiver_id,
            updated = result.rows_affected(),
            "Marked messages read"
        );

        for row in unread {
            let mut message = Message::from(row);
            message.is_read = true;
            self.router
                .publish(&MessageEvent {
                    kind: EventKind::Updated,
                    message,
                })
                .await;
        }

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, receiver_id: &str) -> Result<u64, MessagingError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0",
        )
        .bind(receiver_id)
        .fetch_one(self.pool_manager.pool())
        .await
        .map_err(|e| MessagingError::Load(e.to_string()))?;

        Ok(count.0 as u64)
    }

    async fn subscribe(&self, filter: EventFilter) -> Result<Subscription, SubscriptionError> {
        Ok(self.router.subscribe(filter).await)
    }
}
