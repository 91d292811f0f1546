use {
    anyhow::Result,
    async_trait::async_trait,
    sqlx::SqlitePool,
    std::str::FromStr,
};

use convoy_channels::Platform;

use crate::types::{Conversation, ConversationStatus, Priority};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    tenant_id: String,
    contact_id: String,
    platform: String,
    thread_id: String,
    status: String,
    priority: String,
    last_message_at: i64,
    last_message_preview: Option<String>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = anyhow::Error;

    fn try_from(r: ConversationRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            tenant_id: r.tenant_id,
            contact_id: r.contact_id,
            platform: Platform::from_str(&r.platform)?,
            thread_id: r.thread_id,
            status: ConversationStatus::parse(&r.status),
            priority: Priority::parse(&r.priority),
            last_message_at: r.last_message_at,
            last_message_preview: r.last_message_preview,
        })
    }
}

/// Resolution and lifecycle of the single active conversation per
/// (contact, platform).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Resolve the open conversation for `(contact, platform)`, creating an
    /// active medium-priority row if none exists. Touches
    /// `last_message_at`/`last_message_preview` on hit. The single-active
    /// invariant is enforced by a partial unique index, not by locking;
    /// closed rows are never reopened.
    async fn resolve_active(
        &self,
        tenant_id: &str,
        contact_id: &str,
        platform: Platform,
        thread_id: &str,
        seen_at: i64,
        preview: &str,
    ) -> Result<Conversation>;

    /// Advance `last_message_at`/preview after an outbound send.
    async fn touch(&self, conversation_id: &str, at: i64, preview: &str) -> Result<()>;

    /// Raise priority. Returns true when the row actually changed; a raise
    /// to an equal-or-lower level is a no-op.
    async fn escalate(&self, conversation_id: &str, priority: Priority) -> Result<bool>;

    /// Close an active conversation. Returns false if it was already closed.
    async fn close(&self, conversation_id: &str) -> Result<bool>;

    /// Close every active conversation idle since before `cutoff`.
    /// Returns the number of conversations closed.
    async fn close_idle(&self, cutoff: i64) -> Result<u64>;

    async fn get(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    async fn list_by_tenant(&self, tenant_id: &str, limit: u32) -> Result<Vec<Conversation>>;
}

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the conversations table schema.
    ///
    /// Schema is managed by sqlx migrations in production; this is retained
    /// for tests that use in-memory databases.
    #[doc(hidden)]
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                id                   TEXT    PRIMARY KEY,
                tenant_id            TEXT    NOT NULL,
                contact_id           TEXT    NOT NULL,
                platform             TEXT    NOT NULL,
                thread_id            TEXT    NOT NULL,
                status               TEXT    NOT NULL DEFAULT 'active',
                priority             TEXT    NOT NULL DEFAULT 'medium',
                last_message_at      INTEGER NOT NULL,
                last_message_preview TEXT
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_active
             ON conversations (contact_id, platform) WHERE status = 'active'",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn fetch_active(
        &self,
        contact_id: &str,
        platform: Platform,
    ) -> Result<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "SELECT * FROM conversations
             WHERE contact_id = ? AND platform = ? AND status = 'active'",
        )
        .bind(contact_id)
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn resolve_active(
        &self,
        tenant_id: &str,
        contact_id: &str,
        platform: Platform,
        thread_id: &str,
        seen_at: i64,
        preview: &str,
    ) -> Result<Conversation> {
        sqlx::query(
            r#"INSERT INTO conversations
               (id, tenant_id, contact_id, platform, thread_id,
                status, priority, last_message_at, last_message_preview)
               VALUES (?, ?, ?, ?, ?, 'active', 'medium', ?, ?)
               ON CONFLICT(contact_id, platform) WHERE status = 'active' DO UPDATE SET
                 last_message_at      = MAX(last_message_at, excluded.last_message_at),
                 last_message_preview = excluded.last_message_preview"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(tenant_id)
        .bind(contact_id)
        .bind(platform.as_str())
        .bind(thread_id)
        .bind(seen_at)
        .bind(preview)
        .execute(&self.pool)
        .await?;

        self.fetch_active(contact_id, platform)
            .await?
            .ok_or_else(|| anyhow::anyhow!("active conversation missing after upsert"))
    }

    async fn touch(&self, conversation_id: &str, at: i64, preview: &str) -> Result<()> {
        sqlx::query(
            "UPDATE conversations
             SET last_message_at = MAX(last_message_at, ?), last_message_preview = ?
             WHERE id = ?",
        )
        .bind(at)
        .bind(preview)
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn escalate(&self, conversation_id: &str, priority: Priority) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET priority = ?
             WHERE id = ? AND status = 'active'
               AND (CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END)
                 < (CASE ?     WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END)",
        )
        .bind(priority.as_str())
        .bind(conversation_id)
        .bind(priority.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self, conversation_id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE conversations SET status = 'closed' WHERE id = ? AND status = 'active'")
                .bind(conversation_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close_idle(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE conversations SET status = 'closed'
             WHERE status = 'active' AND last_message_at < ?",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn get(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: &str, limit: u32) -> Result<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            "SELECT * FROM conversations
             WHERE tenant_id = ? ORDER BY last_message_at DESC LIMIT ?",
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
