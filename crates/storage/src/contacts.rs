use {
    anyhow::Result,
    async_trait::async_trait,
    sqlx::SqlitePool,
    std::str::FromStr,
};

use convoy_channels::{Platform, ProfileHint};

use crate::types::Contact;

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct ContactRow {
    id: String,
    tenant_id: String,
    platform: String,
    platform_id: String,
    display_name: Option<String>,
    username: Option<String>,
    last_seen: i64,
    lead_score: i64,
    lifecycle_stage: String,
    metadata: String,
}

impl TryFrom<ContactRow> for Contact {
    type Error = anyhow::Error;

    fn try_from(r: ContactRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            tenant_id: r.tenant_id,
            platform: Platform::from_str(&r.platform)?,
            platform_id: r.platform_id,
            display_name: r.display_name,
            username: r.username,
            last_seen: r.last_seen,
            lead_score: r.lead_score,
            lifecycle_stage: r.lifecycle_stage,
            metadata: serde_json::from_str(&r.metadata)?,
        })
    }
}

/// Identity resolution for external platform users.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Resolve `(tenant, platform, platform_id)` to its contact, creating it
    /// on first sight. Advances `last_seen` monotonically and merges
    /// non-empty profile hint fields. One atomic upsert; safe under
    /// concurrent duplicate deliveries for the same identity.
    async fn upsert_inbound(
        &self,
        tenant_id: &str,
        platform: Platform,
        platform_id: &str,
        hint: &ProfileHint,
        seen_at: i64,
    ) -> Result<Contact>;

    /// Apply a lead-score delta, clamped to 0–100. Returns the new score.
    async fn adjust_lead_score(&self, contact_id: &str, delta: i64) -> Result<i64>;

    async fn get(&self, contact_id: &str) -> Result<Option<Contact>>;

    async fn list_by_tenant(&self, tenant_id: &str, limit: u32) -> Result<Vec<Contact>>;
}

/// SQLite-backed contact store.
pub struct SqliteContactStore {
    pool: SqlitePool,
}

impl SqliteContactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the contacts table schema.
    ///
    /// Schema is managed by sqlx migrations in production; this is retained
    /// for tests that use in-memory databases.
    #[doc(hidden)]
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS contacts (
                id              TEXT    PRIMARY KEY,
                tenant_id       TEXT    NOT NULL,
                platform        TEXT    NOT NULL,
                platform_id     TEXT    NOT NULL,
                display_name    TEXT,
                username        TEXT,
                last_seen       INTEGER NOT NULL,
                lead_score      INTEGER NOT NULL DEFAULT 0,
                lifecycle_stage TEXT    NOT NULL DEFAULT 'lead',
                metadata        TEXT    NOT NULL DEFAULT '{}'
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_identity
             ON contacts (tenant_id, platform, platform_id)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn fetch(
        &self,
        tenant_id: &str,
        platform: Platform,
        platform_id: &str,
    ) -> Result<Option<Contact>> {
        let row = sqlx::query_as::<_, ContactRow>(
            "SELECT * FROM contacts WHERE tenant_id = ? AND platform = ? AND platform_id = ?",
        )
        .bind(tenant_id)
        .bind(platform.as_str())
        .bind(platform_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl ContactStore for SqliteContactStore {
    async fn upsert_inbound(
        &self,
        tenant_id: &str,
        platform: Platform,
        platform_id: &str,
        hint: &ProfileHint,
        seen_at: i64,
    ) -> Result<Contact> {
        sqlx::query(
            r#"INSERT INTO contacts
               (id, tenant_id, platform, platform_id, display_name, username,
                last_seen, lead_score, lifecycle_stage, metadata)
               VALUES (?, ?, ?, ?, ?, ?, ?, 0, 'lead', '{}')
               ON CONFLICT(tenant_id, platform, platform_id) DO UPDATE SET
                 last_seen    = MAX(last_seen, excluded.last_seen),
                 display_name = COALESCE(excluded.display_name, display_name),
                 username     = COALESCE(excluded.username, username)"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(tenant_id)
        .bind(platform.as_str())
        .bind(platform_id)
        .bind(&hint.display_name)
        .bind(&hint.username)
        .bind(seen_at)
        .execute(&self.pool)
        .await?;

        self.fetch(tenant_id, platform, platform_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("contact row missing after upsert"))
    }

    async fn adjust_lead_score(&self, contact_id: &str, delta: i64) -> Result<i64> {
        sqlx::query("UPDATE contacts SET lead_score = MIN(100, MAX(0, lead_score + ?)) WHERE id = ?")
            .bind(delta)
            .bind(contact_id)
            .execute(&self.pool)
            .await?;

        let (score,): (i64,) =
            sqlx::query_as("SELECT lead_score FROM contacts WHERE id = ?")
                .bind(contact_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(score)
    }

    async fn get(&self, contact_id: &str) -> Result<Option<Contact>> {
        let row = sqlx::query_as::<_, ContactRow>("SELECT * FROM contacts WHERE id = ?")
            .bind(contact_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: &str, limit: u32) -> Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, ContactRow>(
            "SELECT * FROM contacts WHERE tenant_id = ? ORDER BY last_seen DESC LIMIT ?",
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
