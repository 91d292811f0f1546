//! Channel connector system.
//!
//! Each messaging platform (Telegram, WhatsApp, etc.) implements the
//! [`ChannelConnector`] trait: a normalizer that turns raw webhook JSON into
//! canonical [`InboundEvent`]s at the boundary, plus an outbound adapter for
//! sending replies. Provider-specific payload shapes never leak past a
//! connector; downstream code only sees the canonical model.

pub mod error;
pub mod event;
pub mod plugin;
pub mod registry;
pub mod sink;

pub use {
    error::{Error, Result},
    event::{
        InboundEvent, MessageKind, NormalizeError, NormalizedUpdate, Platform, ProfileHint,
    },
    plugin::{ChannelConnector, ChannelOutbound, OutboundPayload, SendReceipt},
    registry::ConnectorRegistry,
    sink::{MessageEvent, MessageEventSink, NullEventSink},
};
