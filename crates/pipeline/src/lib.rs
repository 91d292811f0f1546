//! Ingestion pipeline: canonical inbound events → durable conversation state.
//!
//! One [`ingest::Ingestor`] run per webhook delivery:
//!
//! ```text
//! normalize → resolve contact → resolve conversation → store (dedup)
//!           → classify → broadcast (fire-and-forget)
//! ```
//!
//! Every event in a delivery is processed independently; a failing event
//! never aborts its siblings. All identity and message-id races are absorbed
//! by the storage layer's atomic upserts, so replaying a whole batch is
//! always safe.
//!
//! The symmetric outbound path lives in [`outbound::OutboundSender`]: it
//! pre-registers provider message ids so delivery echoes dedupe instead of
//! reappearing as inbound messages.

pub mod classify;
pub mod error;
pub mod ingest;
pub mod outbound;

pub use {
    classify::{Classification, Classifier, ContactContext, KeywordClassifier},
    error::{IngestError, OutboundError},
    ingest::{BatchReport, IngestOutcome, Ingestor},
    outbound::{OutboundRequest, OutboundSender},
};
