//! Persistent conversation model for convoy.
//!
//! Three stores, one invariant each:
//! - [`contacts::ContactStore`] — unique external identity per tenant,
//! - [`conversations::ConversationStore`] — at most one active conversation
//!   per (contact, platform),
//! - [`messages::MessageStore`] — exactly one row per provider message id.
//!
//! All contended writes are single-statement `INSERT ... ON CONFLICT`
//! upserts so concurrent duplicate deliveries cannot race a check-then-write
//! sequence into duplicate rows.

pub mod contacts;
pub mod conversations;
pub mod messages;
pub mod types;

pub use {
    contacts::{ContactStore, SqliteContactStore},
    conversations::{ConversationStore, SqliteConversationStore},
    messages::{MessageStore, NewMessage, SqliteMessageStore, StoreOutcome},
    types::{Contact, Conversation, ConversationStatus, Direction, Message, Priority},
};

/// Run database migrations for the storage crate.
///
/// Creates the contacts/conversations/messages tables and their unique
/// indexes. Call at application startup before constructing the stores.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
