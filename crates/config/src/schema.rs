//! Config schema: server, database, ingest, classifier, and provider
//! account bindings.

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvoyConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub classifier: ClassifierConfig,
    pub accounts: AccountsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path. Defaults to `convoy.db` in the data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Close active conversations with no traffic for this many minutes.
    /// 0 disables the sweep.
    pub idle_timeout_minutes: u64,
    /// How often the idle sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: 0,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Urgency vocabulary. Empty means the built-in default set.
    pub urgency_terms: Vec<String>,
    /// Lead-score step per inbound message.
    pub score_step: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            urgency_terms: Vec::new(),
            score_step: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    pub telegram: Vec<TelegramAccount>,
    pub whatsapp: Vec<WhatsAppAccount>,
}

impl AccountsConfig {
    pub fn telegram_account(&self, id: &str) -> Option<&TelegramAccount> {
        self.telegram.iter().find(|a| a.id == id)
    }

    pub fn whatsapp_account(&self, id: &str) -> Option<&WhatsAppAccount> {
        self.whatsapp.iter().find(|a| a.id == id)
    }
}

/// One Telegram bot account bound to a tenant.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramAccount {
    /// Account id, used in the webhook path.
    pub id: String,
    pub tenant_id: String,
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header. Unset skips the check.
    #[serde(default)]
    pub secret_token: Option<String>,
    /// Bot API host override (proxies, tests).
    #[serde(default)]
    pub api_base: Option<String>,
}

impl std::fmt::Debug for TelegramAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccount")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("bot_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// One WhatsApp Cloud API number bound to a tenant.
#[derive(Clone, Serialize, Deserialize)]
pub struct WhatsAppAccount {
    /// Account id, used in the webhook path.
    pub id: String,
    pub tenant_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    pub phone_number_id: String,
    /// Token echoed during the `hub.challenge` subscription handshake.
    pub verify_token: String,
    /// App secret for `X-Hub-Signature-256` verification. Unset skips the check.
    #[serde(default)]
    pub app_secret: Option<String>,
    /// Graph API host override (proxies, tests).
    #[serde(default)]
    pub api_base: Option<String>,
}

impl std::fmt::Debug for WhatsAppAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppAccount")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = ConvoyConfig::default();
        assert_eq!(cfg.server.port, 8787);
        assert_eq!(cfg.ingest.idle_timeout_minutes, 0);
        assert_eq!(cfg.classifier.score_step, 5);
        assert!(cfg.accounts.telegram.is_empty());
    }

    #[test]
    fn deserialize_accounts_from_toml() {
        let cfg: ConvoyConfig = toml::from_str(
            r#"
            [[accounts.telegram]]
            id = "support-bot"
            tenant_id = "acme"
            bot_token = "123:ABC"
            secret_token = "hook-secret"

            [[accounts.whatsapp]]
            id = "main-line"
            tenant_id = "acme"
            access_token = "EAAG..."
            phone_number_id = "1055512345"
            verify_token = "verify-me"
        "#,
        )
        .unwrap();

        let tg = cfg.accounts.telegram_account("support-bot").unwrap();
        assert_eq!(tg.tenant_id, "acme");
        assert_eq!(tg.bot_token.expose_secret(), "123:ABC");
        assert_eq!(tg.secret_token.as_deref(), Some("hook-secret"));

        let wa = cfg.accounts.whatsapp_account("main-line").unwrap();
        assert_eq!(wa.phone_number_id, "1055512345");
        assert!(wa.app_secret.is_none());
        assert!(cfg.accounts.telegram_account("nope").is_none());
    }

    #[test]
    fn debug_redacts_tokens() {
        let cfg: ConvoyConfig = toml::from_str(
            r#"
            [[accounts.telegram]]
            id = "b"
            tenant_id = "t"
            bot_token = "123:SECRET"
        "#,
        )
        .unwrap();
        let debug = format!("{:?}", cfg.accounts.telegram[0]);
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("[REDACTED]"));
    }
}
