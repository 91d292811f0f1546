use std::{collections::HashMap, sync::Arc};

use {
    convoy_channels::{ChannelConnector, Platform},
    convoy_pipeline::{Ingestor, OutboundSender},
    convoy_storage::{ContactStore, ConversationStore, MessageStore},
};

use crate::broadcast::ClientRegistry;

/// Per-account webhook authentication material.
#[derive(Clone)]
pub enum AccountAuth {
    Telegram {
        /// Expected `X-Telegram-Bot-Api-Secret-Token` header, if configured.
        secret_token: Option<String>,
    },
    Whatsapp {
        /// Token for the `hub.challenge` subscription handshake.
        verify_token: String,
        /// App secret for `X-Hub-Signature-256`, if configured.
        app_secret: Option<String>,
    },
}

/// One configured provider account: tenant binding, connector, webhook auth.
#[derive(Clone)]
pub struct AccountBinding {
    pub tenant_id: String,
    pub platform: Platform,
    pub connector: Arc<dyn ChannelConnector>,
    pub auth: AccountAuth,
}

/// Shared gateway state. Built once at startup and injected into every
/// route handler; no module-level singletons.
pub struct GatewayState {
    /// `(platform, account id)` → binding, from config.
    pub accounts: HashMap<(Platform, String), AccountBinding>,
    pub contacts: Arc<dyn ContactStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub ingestor: Arc<Ingestor>,
    /// Outbound sender per tenant (each tenant sends through its own
    /// connector registry).
    pub senders: HashMap<String, Arc<OutboundSender>>,
    pub clients: Arc<ClientRegistry>,
}

impl GatewayState {
    pub fn account(&self, platform: Platform, account_id: &str) -> Option<&AccountBinding> {
        self.accounts.get(&(platform, account_id.to_string()))
    }

    pub fn sender_for_tenant(&self, tenant_id: &str) -> Option<Arc<OutboundSender>> {
        self.senders.get(tenant_id).map(Arc::clone)
    }
}
