//! Telegram Bot API connector.
//!
//! Webhook-driven: Telegram POSTs one `Update` per delivery (arrays from
//! poll-style relays are accepted too). The normalizer maps every message
//! subtype onto the canonical event model; the outbound client talks to the
//! Bot API directly over HTTPS.

pub mod connector;
pub mod normalize;
pub mod outbound;
pub mod types;

pub use {connector::TelegramConnector, outbound::TelegramOutbound};
