//! Outbound sends via the Telegram Bot API.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use convoy_channels::{
    ChannelOutbound, Error, MessageKind, OutboundPayload, Result, SendReceipt,
};

use crate::types::{ApiResponse, ReplyParameters, SentMessage};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API client. One instance per configured bot account.
pub struct TelegramOutbound {
    http: reqwest::Client,
    token: Secret<String>,
    api_base: String,
}

impl TelegramOutbound {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.token.expose_secret()
        )
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<SentMessage> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external("telegram api request", e))?;

        let envelope: ApiResponse<SentMessage> = response
            .json()
            .await
            .map_err(|e| Error::external("telegram api response", e))?;

        if !envelope.ok {
            return Err(Error::provider(
                envelope.error_code.map(|c| c.to_string()),
                envelope
                    .description
                    .unwrap_or_else(|| "telegram rejected the request".into()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| Error::invalid_input("telegram response missing result"))
    }
}

/// Build the JSON body for one send, picking the Bot API method by kind.
/// Media kinds without a file reference degrade to a plain text send so
/// content is never silently lost.
fn send_request(chat_id: &str, payload: &OutboundPayload) -> (&'static str, serde_json::Value) {
    let mut body = serde_json::json!({ "chat_id": chat_id });

    let method = match (payload.kind, payload.media_ref.as_deref()) {
        (MessageKind::Image, Some(file)) => {
            body["photo"] = serde_json::json!(file);
            body["caption"] = serde_json::json!(payload.content);
            "sendPhoto"
        },
        (MessageKind::Video, Some(file)) => {
            body["video"] = serde_json::json!(file);
            body["caption"] = serde_json::json!(payload.content);
            "sendVideo"
        },
        (MessageKind::Audio, Some(file)) => {
            body["audio"] = serde_json::json!(file);
            body["caption"] = serde_json::json!(payload.content);
            "sendAudio"
        },
        (MessageKind::Document, Some(file)) => {
            body["document"] = serde_json::json!(file);
            body["caption"] = serde_json::json!(payload.content);
            "sendDocument"
        },
        (MessageKind::Sticker, Some(file)) => {
            body["sticker"] = serde_json::json!(file);
            "sendSticker"
        },
        _ => {
            body["text"] = serde_json::json!(payload.content);
            "sendMessage"
        },
    };

    if let Some(reply_to) = payload.reply_to.as_deref()
        && let Ok(message_id) = reply_to.parse::<i64>()
    {
        body["reply_parameters"] =
            serde_json::json!(ReplyParameters { message_id });
    }

    (method, body)
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send(&self, thread_id: &str, payload: &OutboundPayload) -> Result<SendReceipt> {
        let (method, body) = send_request(thread_id, payload);
        debug!(chat_id = thread_id, method, "sending telegram message");
        let sent = self.call(method, body).await?;
        Ok(SendReceipt {
            provider_message_id: sent.message_id.to_string(),
        })
    }
}
