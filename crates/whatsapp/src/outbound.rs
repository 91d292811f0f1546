//! Outbound sends via the Graph `/{phone_number_id}/messages` endpoint.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use convoy_channels::{
    ChannelOutbound, Error, MessageKind, OutboundPayload, Result, SendReceipt,
};

use crate::types::{GraphErrorEnvelope, SendResponse};

const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v21.0";

/// Cloud API client. One instance per configured business phone number.
pub struct WhatsAppOutbound {
    http: reqwest::Client,
    access_token: Secret<String>,
    phone_number_id: String,
    api_base: String,
}

impl WhatsAppOutbound {
    pub fn new(access_token: Secret<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            phone_number_id: phone_number_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Build the Cloud API request body. A `media_ref` starting with `http` is
/// sent as a link, anything else as an uploaded-media id. Kinds the endpoint
/// cannot carry degrade to a text send.
fn send_body(to: &str, payload: &OutboundPayload) -> serde_json::Value {
    let mut body = serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
    });

    let media = |reference: &str| {
        if reference.starts_with("http") {
            serde_json::json!({ "link": reference, "caption": payload.content })
        } else {
            serde_json::json!({ "id": reference, "caption": payload.content })
        }
    };

    match (payload.kind, payload.media_ref.as_deref()) {
        (MessageKind::Image, Some(r)) => {
            body["type"] = serde_json::json!("image");
            body["image"] = media(r);
        },
        (MessageKind::Video, Some(r)) => {
            body["type"] = serde_json::json!("video");
            body["video"] = media(r);
        },
        (MessageKind::Audio, Some(r)) => {
            body["type"] = serde_json::json!("audio");
            body["audio"] = media(r);
        },
        (MessageKind::Document, Some(r)) => {
            body["type"] = serde_json::json!("document");
            body["document"] = media(r);
        },
        _ => {
            body["type"] = serde_json::json!("text");
            body["text"] = serde_json::json!({ "body": payload.content });
        },
    }

    if let Some(reply_to) = payload.reply_to.as_deref() {
        body["context"] = serde_json::json!({ "message_id": reply_to });
    }

    body
}

#[async_trait]
impl ChannelOutbound for WhatsAppOutbound {
    async fn send(&self, thread_id: &str, payload: &OutboundPayload) -> Result<SendReceipt> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        debug!(to = thread_id, kind = %payload.kind, "sending whatsapp message");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&send_body(thread_id, payload))
            .send()
            .await
            .map_err(|e| Error::external("whatsapp api request", e))?;

        if !response.status().is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Error::external("whatsapp api error body", e))?;
            return Err(match serde_json::from_str::<GraphErrorEnvelope>(&body) {
                Ok(envelope) => Error::provider(
                    Some(envelope.error.code.to_string()),
                    envelope.error.message,
                ),
                Err(_) => Error::provider(None, body),
            });
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| Error::external("whatsapp api response", e))?;
        let id = sent
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| Error::invalid_input("whatsapp response missing message id"))?;

        Ok(SendReceipt {
            provider_message_id: id,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_body_shape() {
        let body = send_body("491700", &OutboundPayload::text("Hello"));
        assert_eq!(body["messaging_product"], "whatsapp");
        assert_eq!(body["to"], "491700");
        assert_eq!(body["type"], "text");
        assert_eq!(body["text"]["body"], "Hello");
    }

    #[test]
    fn uploaded_media_vs_link() {
        let uploaded = OutboundPayload {
            kind: MessageKind::Image,
            content: "cap".into(),
            media_ref: Some("media-1".into()),
            reply_to: None,
        };
        let body = send_body("491700", &uploaded);
        assert_eq!(body["type"], "image");
        assert_eq!(body["image"]["id"], "media-1");

        let linked = OutboundPayload {
            media_ref: Some("https://cdn.example/pic.jpg".into()),
            ..uploaded
        };
        let body = send_body("491700", &linked);
        assert_eq!(body["image"]["link"], "https://cdn.example/pic.jpg");
    }

    #[test]
    fn reply_context_is_attached() {
        let payload = OutboundPayload {
            reply_to: Some("wamid.orig".into()),
            ..OutboundPayload::text("re")
        };
        let body = send_body("491700", &payload);
        assert_eq!(body["context"]["message_id"], "wamid.orig");
    }

    #[tokio::test]
    async fn successful_send_returns_wamid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pn-1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.OUT1"}]}"#)
            .create_async()
            .await;

        let outbound = WhatsAppOutbound::new(Secret::new("token".into()), "pn-1")
            .with_api_base(server.url());
        let receipt = outbound
            .send("491700", &OutboundPayload::text("Hello"))
            .await
            .unwrap();
        assert_eq!(receipt.provider_message_id, "wamid.OUT1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn graph_error_maps_to_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pn-1/messages")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":{"message":"Recipient phone number not in allowed list","type":"OAuthException","code":131030}}"#,
            )
            .create_async()
            .await;

        let outbound = WhatsAppOutbound::new(Secret::new("token".into()), "pn-1")
            .with_api_base(server.url());
        let err = outbound
            .send("491700", &OutboundPayload::text("Hello"))
            .await
            .unwrap_err();
        match err {
            Error::Provider { code, message } => {
                assert_eq!(code.as_deref(), Some("131030"));
                assert!(message.contains("not in allowed list"));
            },
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
