//! Raw Cloud API webhook JSON → canonical inbound events.

use std::collections::HashMap;

use convoy_channels::{
    InboundEvent, MessageKind, NormalizeError, NormalizedUpdate, Platform, ProfileHint,
};

use crate::types::{WaMessage, WaStatus, WebhookPayload};

/// Parse a webhook body. One delivery may fan out to many messages and
/// statuses across entries; each item is isolated so a bad one never blocks
/// its siblings.
pub fn normalize(raw: &serde_json::Value) -> Result<Vec<NormalizedUpdate>, NormalizeError> {
    let payload: WebhookPayload =
        serde_json::from_value(raw.clone()).map_err(NormalizeError::from)?;

    let mut updates = Vec::new();
    for entry in payload.entry {
        for change in entry.changes {
            if change.field != "messages" {
                updates.push(NormalizedUpdate::Ignored {
                    reason: format!("unhandled change field: {}", change.field),
                });
                continue;
            }
            let value = change.value;

            // wa_id → profile name, observed alongside the messages.
            let names: HashMap<String, String> = value
                .contacts
                .iter()
                .filter_map(|c| c.profile.as_ref().map(|p| (c.wa_id.clone(), p.name.clone())))
                .collect();

            for item in &value.messages {
                updates.push(match serde_json::from_value::<WaMessage>(item.clone()) {
                    Ok(message) => message_event(message, &names),
                    Err(e) => NormalizedUpdate::Malformed {
                        detail: e.to_string(),
                    },
                });
            }

            for item in &value.statuses {
                updates.push(match serde_json::from_value::<WaStatus>(item.clone()) {
                    Ok(status) => NormalizedUpdate::Receipt {
                        message_id: status.id,
                        status: status.status,
                    },
                    Err(e) => NormalizedUpdate::Malformed {
                        detail: e.to_string(),
                    },
                });
            }
        }
    }
    Ok(updates)
}

fn message_event(message: WaMessage, names: &HashMap<String, String>) -> NormalizedUpdate {
    let caption = |media: &Option<crate::types::WaMedia>| {
        media
            .as_ref()
            .and_then(|m| m.caption.clone())
            .unwrap_or_default()
    };
    let media_id =
        |media: &Option<crate::types::WaMedia>| media.as_ref().map(|m| m.id.clone());

    let mut metadata = serde_json::Map::new();
    let (kind, content, media_ref) = match message.message_type.as_str() {
        "text" => (
            MessageKind::Text,
            message.text.as_ref().map(|t| t.body.clone()).unwrap_or_default(),
            None,
        ),
        "image" => (MessageKind::Image, caption(&message.image), media_id(&message.image)),
        "video" => (MessageKind::Video, caption(&message.video), media_id(&message.video)),
        "audio" => (MessageKind::Audio, caption(&message.audio), media_id(&message.audio)),
        "document" => {
            let content = {
                let c = caption(&message.document);
                if c.is_empty() {
                    message
                        .document
                        .as_ref()
                        .and_then(|d| d.filename.clone())
                        .unwrap_or_default()
                } else {
                    c
                }
            };
            (MessageKind::Document, content, media_id(&message.document))
        },
        "sticker" => (MessageKind::Sticker, String::new(), media_id(&message.sticker)),
        "location" => {
            let content = message
                .location
                .as_ref()
                .map(|l| format!("{},{}", l.latitude, l.longitude))
                .unwrap_or_default();
            if let Some(name) = message.location.as_ref().and_then(|l| l.name.clone()) {
                metadata.insert("location_name".into(), serde_json::json!(name));
            }
            (MessageKind::Location, content, None)
        },
        "contacts" => {
            let card = message.contacts.first();
            let phone = card
                .and_then(|c| c.phones.first())
                .and_then(|p| p.phone.clone());
            let name = card
                .and_then(|c| c.name.as_ref())
                .and_then(|n| n.formatted_name.clone());
            if let Some(name) = &name {
                metadata.insert("contact_name".into(), serde_json::json!(name));
            }
            (
                MessageKind::Contact,
                phone.or(name).unwrap_or_default(),
                None,
            )
        },
        other => {
            // Reactions, orders, interactive replies, ... — preserved for the
            // audit trail rather than dropped.
            metadata.insert("provider_type".into(), serde_json::json!(other));
            (
                MessageKind::Unsupported,
                message.text.as_ref().map(|t| t.body.clone()).unwrap_or_default(),
                None,
            )
        },
    };

    NormalizedUpdate::Message(InboundEvent {
        platform: Platform::Whatsapp,
        sender_id: message.from.clone(),
        // DMs only on this transport: the sender's phone is the thread.
        thread_id: message.from.clone(),
        message_id: message.id,
        kind,
        content,
        media_ref,
        reply_to: message.context.and_then(|c| c.id),
        timestamp: message.timestamp.parse().unwrap_or_default(),
        edited: false,
        profile: ProfileHint {
            display_name: names.get(&message.from).cloned(),
            username: None,
        },
        metadata: serde_json::Value::Object(metadata),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> serde_json::Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [ { "id": "wba-1", "changes": [ { "field": "messages", "value": value } ] } ]
        })
    }

    fn expect_event(update: NormalizedUpdate) -> InboundEvent {
        match update {
            NormalizedUpdate::Message(e) => e,
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[test]
    fn text_message_with_profile_name() {
        let raw = envelope(json!({
            "metadata": { "display_phone_number": "15550001", "phone_number_id": "pn-1" },
            "contacts": [ { "wa_id": "491700", "profile": { "name": "Grace" } } ],
            "messages": [ {
                "from": "491700", "id": "wamid.A1", "timestamp": "1700000000",
                "type": "text", "text": { "body": "Hello" }
            } ]
        }));
        let updates = normalize(&raw).unwrap();
        assert_eq!(updates.len(), 1);
        let e = expect_event(updates.into_iter().next().unwrap());
        assert_eq!(e.platform, Platform::Whatsapp);
        assert_eq!(e.sender_id, "491700");
        assert_eq!(e.thread_id, "491700");
        assert_eq!(e.message_id, "wamid.A1");
        assert_eq!(e.content, "Hello");
        assert_eq!(e.timestamp, 1_700_000_000);
        assert_eq!(e.profile.display_name.as_deref(), Some("Grace"));
    }

    #[test]
    fn media_kinds_carry_caption_and_id() {
        let raw = envelope(json!({
            "messages": [
                {
                    "from": "491700", "id": "wamid.img", "timestamp": "1",
                    "type": "image", "image": { "id": "media-9", "caption": "receipt" }
                },
                {
                    "from": "491700", "id": "wamid.doc", "timestamp": "2",
                    "type": "document", "document": { "id": "media-10", "filename": "invoice.pdf" }
                }
            ]
        }));
        let updates = normalize(&raw).unwrap();
        let img = expect_event(updates[0].clone());
        assert_eq!(img.kind, MessageKind::Image);
        assert_eq!(img.content, "receipt");
        assert_eq!(img.media_ref.as_deref(), Some("media-9"));

        let doc = expect_event(updates[1].clone());
        assert_eq!(doc.kind, MessageKind::Document);
        assert_eq!(doc.content, "invoice.pdf");
    }

    #[test]
    fn location_and_contact_cards() {
        let raw = envelope(json!({
            "messages": [
                {
                    "from": "491700", "id": "wamid.loc", "timestamp": "1",
                    "type": "location",
                    "location": { "latitude": 52.52, "longitude": 13.4, "name": "Office" }
                },
                {
                    "from": "491700", "id": "wamid.card", "timestamp": "2",
                    "type": "contacts",
                    "contacts": [ {
                        "name": { "formatted_name": "Alan T" },
                        "phones": [ { "phone": "+44123" } ]
                    } ]
                }
            ]
        }));
        let updates = normalize(&raw).unwrap();
        let loc = expect_event(updates[0].clone());
        assert_eq!(loc.kind, MessageKind::Location);
        assert_eq!(loc.content, "52.52,13.4");
        assert_eq!(loc.metadata["location_name"], json!("Office"));

        let card = expect_event(updates[1].clone());
        assert_eq!(card.kind, MessageKind::Contact);
        assert_eq!(card.content, "+44123");
        assert_eq!(card.metadata["contact_name"], json!("Alan T"));
    }

    #[test]
    fn unknown_type_preserved_as_unsupported() {
        let raw = envelope(json!({
            "messages": [ {
                "from": "491700", "id": "wamid.react", "timestamp": "1",
                "type": "reaction"
            } ]
        }));
        let e = expect_event(normalize(&raw).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Unsupported);
        assert_eq!(e.metadata["provider_type"], json!("reaction"));
    }

    #[test]
    fn statuses_become_receipts() {
        let raw = envelope(json!({
            "statuses": [ {
                "id": "wamid.sent1", "status": "delivered",
                "timestamp": "1700000050", "recipient_id": "491700"
            } ]
        }));
        let updates = normalize(&raw).unwrap();
        match &updates[0] {
            NormalizedUpdate::Receipt { message_id, status } => {
                assert_eq!(message_id, "wamid.sent1");
                assert_eq!(status, "delivered");
            },
            other => panic!("expected receipt, got {other:?}"),
        }
    }

    #[test]
    fn malformed_item_isolated_from_siblings() {
        let raw = envelope(json!({
            "messages": [
                {
                    "from": "491700", "id": "wamid.ok1", "timestamp": "1",
                    "type": "text", "text": { "body": "one" }
                },
                { "type": "text" },
                {
                    "from": "491700", "id": "wamid.ok3", "timestamp": "3",
                    "type": "text", "text": { "body": "three" }
                }
            ]
        }));
        let updates = normalize(&raw).unwrap();
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], NormalizedUpdate::Message(_)));
        assert!(matches!(updates[1], NormalizedUpdate::Malformed { .. }));
        assert!(matches!(updates[2], NormalizedUpdate::Message(_)));
    }

    #[test]
    fn non_message_field_is_ignored() {
        let raw = json!({
            "object": "whatsapp_business_account",
            "entry": [ { "id": "wba-1", "changes": [
                { "field": "account_update", "value": {} }
            ] } ]
        });
        let updates = normalize(&raw).unwrap();
        assert!(matches!(updates[0], NormalizedUpdate::Ignored { .. }));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert!(normalize(&json!({ "entry": "nope" })).is_err());
    }
}
