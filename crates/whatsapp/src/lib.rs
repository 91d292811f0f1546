//! WhatsApp Cloud API connector.
//!
//! Meta delivers webhook batches (`entry` → `changes` → `value`) carrying
//! inbound messages, contact profiles, and delivery statuses. The normalizer
//! maps them onto the canonical event model; [`webhook`] verifies the
//! `X-Hub-Signature-256` HMAC and the subscription handshake; the outbound
//! client posts to the Graph `/{phone_number_id}/messages` endpoint.

pub mod connector;
pub mod normalize;
pub mod outbound;
pub mod types;
pub mod webhook;

pub use {
    connector::WhatsAppConnector,
    outbound::WhatsAppOutbound,
    webhook::{verify_signature, verify_subscription},
};
