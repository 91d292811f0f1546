//! Gateway: HTTP server for provider webhooks, the dashboard REST surface,
//! and the WebSocket event stream.
//!
//! Lifecycle:
//! 1. Load config, open the SQLite pool, run migrations
//! 2. Build stores, connectors, pipeline, per-tenant outbound senders
//! 3. Serve webhook + API routes; fan out stored-message events over `/ws`
//! 4. Run the idle-conversation sweeper in the background
//!
//! Webhook status contract: 2xx once every event in the delivery is durably
//! stored (or recognizably malformed/duplicate), non-2xx only for retryable
//! storage failures — providers redeliver, and the storage upserts make the
//! replay safe.

pub mod api;
pub mod broadcast;
pub mod server;
pub mod state;
pub mod webhooks;
pub mod ws;

pub use server::{build_app, build_state, run};
