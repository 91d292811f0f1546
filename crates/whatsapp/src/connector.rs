use secrecy::Secret;

use convoy_channels::{ChannelConnector, ChannelOutbound, NormalizeError, NormalizedUpdate, Platform};

use crate::{normalize, outbound::WhatsAppOutbound};

/// WhatsApp connector: Cloud API webhook normalizer plus Graph outbound.
pub struct WhatsAppConnector {
    outbound: WhatsAppOutbound,
}

impl WhatsAppConnector {
    pub fn new(access_token: Secret<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            outbound: WhatsAppOutbound::new(access_token, phone_number_id),
        }
    }

    /// Override the Graph API host (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.outbound = self.outbound.with_api_base(api_base);
        self
    }
}

impl ChannelConnector for WhatsAppConnector {
    fn platform(&self) -> Platform {
        Platform::Whatsapp
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
