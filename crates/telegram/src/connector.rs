use secrecy::Secret;

use convoy_channels::{ChannelConnector, ChannelOutbound, NormalizeError, NormalizedUpdate, Platform};

use crate::{normalize, outbound::TelegramOutbound};

/// Telegram connector: webhook normalizer plus Bot API outbound.
pub struct TelegramConnector {
    outbound: TelegramOutbound,
}

impl TelegramConnector {
    pub fn new(bot_token: Secret<String>) -> Self {
        Self {
            outbound: TelegramOutbound::new(bot_token),
        }
    }

    /// Override the Bot API host (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.outbound = self.outbound.with_api_base(api_base);
        self
    }
}

impl ChannelConnector for TelegramConnector {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    fn normalize(
        &self,
        raw: &serde_json::Value,
    ) -> Result<Vec<NormalizedUpdate>, NormalizeError> {
        normalize::normalize(raw)
    }

    fn outbound(&self) -> Option<&dyn ChannelOutbound> {
        Some(&self.outbound)
    }
}
