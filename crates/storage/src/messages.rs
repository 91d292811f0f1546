use {
    anyhow::Result,
    async_trait::async_trait,
    sqlx::SqlitePool,
    std::str::FromStr,
};

use convoy_channels::{MessageKind, Platform};

use crate::types::{Direction, Message};

/// Input for a message insert. The `(platform, platform_message_id)` pair is
/// the idempotency key that absorbs provider retries.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub contact_id: String,
    pub platform: Platform,
    pub platform_message_id: String,
    pub direction: Direction,
    pub kind: MessageKind,
    pub content: String,
    pub media_ref: Option<String>,
    pub reply_to: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: i64,
}

/// Result of an idempotent insert: the surviving row, and whether this call
/// created it.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub created: bool,
    pub message: Message,
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    contact_id: String,
    platform: String,
    platform_message_id: String,
    direction: String,
    kind: String,
    content: String,
    media_ref: Option<String>,
    reply_to: Option<String>,
    metadata: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(r: MessageRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            conversation_id: r.conversation_id,
            contact_id: r.contact_id,
            platform: Platform::from_str(&r.platform)?,
            platform_message_id: r.platform_message_id,
            direction: Direction::parse(&r.direction),
            kind: MessageKind::parse(&r.kind),
            content: r.content,
            media_ref: r.media_ref,
            reply_to: r.reply_to,
            metadata: serde_json::from_str(&r.metadata)?,
            created_at: r.created_at,
        })
    }
}

/// Idempotent message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert keyed on `(platform, platform_message_id)`. If the key exists
    /// the existing row is returned untouched with `created = false`.
    /// Tolerates replays, reordering, and concurrent calls for the same key.
    async fn insert_unique(&self, message: &NewMessage) -> Result<StoreOutcome>;

    /// Apply an edit to an existing row: swap content, stamp
    /// `metadata.edited = true` and `metadata.editedAt`, and preserve the
    /// first-seen content in `metadata.originalContent`. Returns `None` when
    /// no row exists for the id.
    async fn apply_edit(
        &self,
        platform: Platform,
        platform_message_id: &str,
        content: &str,
        edited_at: i64,
    ) -> Result<Option<Message>>;

    /// Stamp a delivery-receipt status onto an existing row. Returns false
    /// when the id is unknown.
    async fn mark_delivery(
        &self,
        platform: Platform,
        platform_message_id: &str,
        status: &str,
    ) -> Result<bool>;

    async fn get_by_platform_id(
        &self,
        platform: Platform,
        platform_message_id: &str,
    ) -> Result<Option<Message>>;

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>>;
}

/// SQLite-backed message store.
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the messages table schema.
    ///
    /// Schema is managed by sqlx migrations in production; this is retained
    /// for tests that use in-memory databases.
    #[doc(hidden)]
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id                  TEXT    PRIMARY KEY,
                conversation_id     TEXT    NOT NULL,
                contact_id          TEXT    NOT NULL,
                platform            TEXT    NOT NULL,
                platform_message_id TEXT    NOT NULL,
                direction           TEXT    NOT NULL,
                kind                TEXT    NOT NULL,
                content             TEXT    NOT NULL,
                media_ref           TEXT,
                reply_to            TEXT,
                metadata            TEXT    NOT NULL DEFAULT '{}',
                created_at          INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_provider_id
             ON messages (platform, platform_message_id)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages (conversation_id, created_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert_unique(&self, message: &NewMessage) -> Result<StoreOutcome> {
        let metadata = serde_json::to_string(&message.metadata)?;
        let result = sqlx::query(
            "INSERT INTO messages
             (id, conversation_id, contact_id, platform, platform_message_id,
              direction, kind, content, media_ref, reply_to, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(platform, platform_message_id) DO NOTHING",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&message.conversation_id)
        .bind(&message.contact_id)
        .bind(message.platform.as_str())
        .bind(&message.platform_message_id)
        .bind(message.direction.as_str())
        .bind(message.kind.as_str())
        .bind(&message.content)
        .bind(&message.media_ref)
        .bind(&message.reply_to)
        .bind(&metadata)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        let row = self
            .get_by_platform_id(message.platform, &message.platform_message_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("message row missing after upsert"))?;
        Ok(StoreOutcome {
            created,
            message: row,
        })
    }

    async fn apply_edit(
        &self,
        platform: Platform,
        platform_message_id: &str,
        content: &str,
        edited_at: i64,
    ) -> Result<Option<Message>> {
        let result = sqlx::query(
            "UPDATE messages SET
               metadata = json_set(metadata,
                   '$.edited', json('true'),
                   '$.originalContent',
                   COALESCE(json_extract(metadata, '$.originalContent'), content),
                   '$.editedAt', ?),
               content = ?
             WHERE platform = ? AND platform_message_id = ?",
        )
        .bind(edited_at)
        .bind(content)
        .bind(platform.as_str())
        .bind(platform_message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_platform_id(platform, platform_message_id).await
    }

    async fn mark_delivery(
        &self,
        platform: Platform,
        platform_message_id: &str,
        status: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE messages SET metadata = json_set(metadata, '$.delivery_status', ?)
             WHERE platform = ? AND platform_message_id = ?",
        )
        .bind(status)
        .bind(platform.as_str())
        .bind(platform_message_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_platform_id(
        &self,
        platform: Platform,
        platform_message_id: &str,
    ) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE platform = ? AND platform_message_id = ?",
        )
        .bind(platform.as_str())
        .bind(platform_message_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages
             WHERE conversation_id = ? ORDER BY created_at ASC LIMIT ?",
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteMessageStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteMessageStore::init(&pool).await.unwrap();
        SqliteMessageStore::new(pool)
    }

    fn inbound(pmid: &str, content: &str) -> NewMessage {
        NewMessage {
            conversation_id: "conv1".into(),
            contact_id: "c1".into(),
            platform: Platform::Telegram,
            platform_message_id: pmid.into(),
            direction: Direction::Inbound,
            kind: MessageKind::Text,
            content: content.into(),
            media_ref: None,
            reply_to: None,
            metadata: serde_json::json!({}),
            created_at: 100,
        }
    }

    #[tokio::test]
    async fn duplicate_delivery_keeps_one_row() {
        let store = test_store().await;
        let first = store.insert_unique(&inbound("m1", "Hello")).await.unwrap();
        assert!(first.created);

        // Provider retry: same id, possibly different wall clock.
        let mut retry = inbound("m1", "Hello");
        retry.created_at = 999;
        let second = store.insert_unique(&retry).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.message.id, first.message.id);
        assert_eq!(second.message.created_at, 100);

        let all = store.list_by_conversation("conv1", 10).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_same_key_inserts_collapse() {
        // File-backed DB: pooled connections must see one shared database
        // for a genuine concurrent write race.
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("msgs.db").display());
        let pool = SqlitePool::connect(&url).await.unwrap();
        SqliteMessageStore::init(&pool).await.unwrap();
        let store = std::sync::Arc::new(SqliteMessageStore::new(pool));

        let a = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move { store.insert_unique(&inbound("m1", "Hello")).await })
        };
        let b = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move { store.insert_unique(&inbound("m1", "Hello")).await })
        };
        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a.message.id, b.message.id);
        assert!(a.created ^ b.created);
    }

    #[tokio::test]
    async fn edit_swaps_content_and_keeps_identity() {
        let store = test_store().await;
        let original = store.insert_unique(&inbound("m1", "Hello")).await.unwrap();

        let edited = store
            .apply_edit(Platform::Telegram, "m1", "Hello, edited", 200)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.id, original.message.id);
        assert_eq!(edited.platform_message_id, "m1");
        assert_eq!(edited.content, "Hello, edited");
        assert_eq!(edited.metadata["edited"], serde_json::json!(true));
        assert_eq!(edited.metadata["originalContent"], "Hello");
        assert_eq!(edited.metadata["editedAt"], 200);
    }

    #[tokio::test]
    async fn second_edit_preserves_first_content() {
        let store = test_store().await;
        store.insert_unique(&inbound("m1", "v1")).await.unwrap();
        store
            .apply_edit(Platform::Telegram, "m1", "v2", 200)
            .await
            .unwrap();
        let m = store
            .apply_edit(Platform::Telegram, "m1", "v3", 300)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.content, "v3");
        assert_eq!(m.metadata["originalContent"], "v1");
    }

    #[tokio::test]
    async fn edit_of_unknown_message_is_none() {
        let store = test_store().await;
        let out = store
            .apply_edit(Platform::Telegram, "ghost", "x", 100)
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn delivery_status_stamps_existing_row_only() {
        let store = test_store().await;
        let mut msg = inbound("wamid.1", "reply");
        msg.platform = Platform::Whatsapp;
        msg.direction = Direction::Outbound;
        store.insert_unique(&msg).await.unwrap();

        assert!(store
            .mark_delivery(Platform::Whatsapp, "wamid.1", "delivered")
            .await
            .unwrap());
        let m = store
            .get_by_platform_id(Platform::Whatsapp, "wamid.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.metadata["delivery_status"], "delivered");

        assert!(!store
            .mark_delivery(Platform::Whatsapp, "wamid.unknown", "delivered")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn same_provider_id_on_other_platform_is_distinct() {
        let store = test_store().await;
        store.insert_unique(&inbound("m1", "tg")).await.unwrap();
        let mut wa = inbound("m1", "wa");
        wa.platform = Platform::Whatsapp;
        let out = store.insert_unique(&wa).await.unwrap();
        assert!(out.created);
    }
}
