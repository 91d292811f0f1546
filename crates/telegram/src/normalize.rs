//! Raw Telegram webhook JSON → canonical inbound events.

use convoy_channels::{
    InboundEvent, MessageKind, NormalizeError, NormalizedUpdate, Platform, ProfileHint,
};

use crate::types::{TelegramMessage, TelegramUpdate};

/// Parse a webhook body. Telegram delivers one `Update` per webhook call;
/// arrays (poll-relay shape) are accepted as a batch, each item isolated.
pub fn normalize(raw: &serde_json::Value) -> Result<Vec<NormalizedUpdate>, NormalizeError> {
    match raw {
        serde_json::Value::Array(items) => Ok(items.iter().map(normalize_one).collect()),
        serde_json::Value::Object(_) => Ok(vec![normalize_one(raw)]),
        _ => Err(NormalizeError::malformed("expected update object or array")),
    }
}

fn normalize_one(raw: &serde_json::Value) -> NormalizedUpdate {
    let update: TelegramUpdate = match serde_json::from_value(raw.clone()) {
        Ok(u) => u,
        Err(e) => {
            return NormalizedUpdate::Malformed {
                detail: e.to_string(),
            };
        },
    };

    let (message, edited) = match (update.message, update.edited_message) {
        (Some(m), _) => (m, false),
        (None, Some(m)) => (m, true),
        (None, None) => {
            return NormalizedUpdate::Ignored {
                reason: format!("update {} carries no message", update.update_id),
            };
        },
    };

    message_event(message, edited)
}

fn message_event(message: TelegramMessage, edited: bool) -> NormalizedUpdate {
    // Channel posts and anonymous admins have no sender to resolve a
    // contact from.
    let Some(from) = message.from else {
        return NormalizedUpdate::Ignored {
            reason: "message has no sender".into(),
        };
    };

    let display_name = {
        let first = from.first_name.as_deref().unwrap_or("");
        let last = from.last_name.as_deref().unwrap_or("");
        let name = format!("{first} {last}").trim().to_string();
        if name.is_empty() { None } else { Some(name) }
    };

    let caption = message.caption.clone().unwrap_or_default();
    let (kind, content, media_ref) = if let Some(text) = message.text.clone() {
        (MessageKind::Text, text, None)
    } else if let Some(photo) = &message.photo {
        // Telegram sends every thumbnail size; keep the largest rendition.
        let best = photo
            .iter()
            .max_by_key(|p| p.width * p.height)
            .map(|p| p.file_id.clone());
        (MessageKind::Image, caption, best)
    } else if let Some(video) = &message.video {
        (MessageKind::Video, caption, Some(video.file_id.clone()))
    } else if let Some(audio) = &message.audio {
        (MessageKind::Audio, caption, Some(audio.file_id.clone()))
    } else if let Some(voice) = &message.voice {
        (MessageKind::Audio, caption, Some(voice.file_id.clone()))
    } else if let Some(document) = &message.document {
        let content = if caption.is_empty() {
            document.file_name.clone().unwrap_or_default()
        } else {
            caption
        };
        (MessageKind::Document, content, Some(document.file_id.clone()))
    } else if let Some(sticker) = &message.sticker {
        (
            MessageKind::Sticker,
            sticker.emoji.clone().unwrap_or_default(),
            Some(sticker.file_id.clone()),
        )
    } else if let Some(location) = &message.location {
        (
            MessageKind::Location,
            format!("{},{}", location.latitude, location.longitude),
            None,
        )
    } else if let Some(contact) = &message.contact {
        (MessageKind::Contact, contact.phone_number.clone(), None)
    } else {
        // Unknown subtype (poll, venue, game, ...): preserved, never dropped.
        (MessageKind::Unsupported, caption, None)
    };

    let mut metadata = serde_json::Map::new();
    if message.voice.is_some() {
        metadata.insert("voice".into(), serde_json::json!(true));
    }
    if let Some(chat_type) = &message.chat.chat_type {
        metadata.insert("chat_type".into(), serde_json::json!(chat_type));
    }
    if let Some(contact) = &message.contact {
        let first = contact.first_name.as_deref().unwrap_or("");
        let last = contact.last_name.as_deref().unwrap_or("");
        let name = format!("{first} {last}").trim().to_string();
        if !name.is_empty() {
            metadata.insert("contact_name".into(), serde_json::json!(name));
        }
    }

    NormalizedUpdate::Message(InboundEvent {
        platform: Platform::Telegram,
        sender_id: from.id.to_string(),
        thread_id: message.chat.id.to_string(),
        message_id: message.message_id.to_string(),
        kind,
        content,
        media_ref,
        reply_to: message
            .reply_to_message
            .as_ref()
            .map(|r| r.message_id.to_string()),
        timestamp: message.date,
        edited,
        profile: ProfileHint {
            display_name,
            username: from.username,
        },
        metadata: serde_json::Value::Object(metadata),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_update(message_id: i64, text: &str) -> serde_json::Value {
        json!({
            "update_id": 90001,
            "message": {
                "message_id": message_id,
                "date": 1_700_000_000,
                "chat": { "id": 555, "type": "private" },
                "from": { "id": 555, "first_name": "Ada", "last_name": "L", "username": "ada" },
                "text": text
            }
        })
    }

    fn expect_event(update: NormalizedUpdate) -> InboundEvent {
        match update {
            NormalizedUpdate::Message(e) => e,
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[test]
    fn text_message_normalizes() {
        let updates = normalize(&text_update(42, "Hello")).unwrap();
        assert_eq!(updates.len(), 1);
        let e = expect_event(updates.into_iter().next().unwrap());
        assert_eq!(e.platform, Platform::Telegram);
        assert_eq!(e.sender_id, "555");
        assert_eq!(e.thread_id, "555");
        assert_eq!(e.message_id, "42");
        assert_eq!(e.kind, MessageKind::Text);
        assert_eq!(e.content, "Hello");
        assert_eq!(e.profile.display_name.as_deref(), Some("Ada L"));
        assert_eq!(e.profile.username.as_deref(), Some("ada"));
        assert!(!e.edited);
    }

    #[test]
    fn photo_takes_largest_size_and_caption() {
        let raw = json!({
            "update_id": 90002,
            "message": {
                "message_id": 43,
                "date": 1_700_000_000,
                "chat": { "id": 555, "type": "private" },
                "from": { "id": 555, "first_name": "Ada" },
                "caption": "my receipt",
                "photo": [
                    { "file_id": "small", "width": 90, "height": 90 },
                    { "file_id": "big", "width": 800, "height": 600 }
                ]
            }
        });
        let e = expect_event(normalize(&raw).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Image);
        assert_eq!(e.content, "my receipt");
        assert_eq!(e.media_ref.as_deref(), Some("big"));
    }

    #[test]
    fn voice_maps_to_audio_with_flag() {
        let raw = json!({
            "update_id": 90003,
            "message": {
                "message_id": 44,
                "date": 1_700_000_000,
                "chat": { "id": 555 },
                "from": { "id": 555 },
                "voice": { "file_id": "v1" }
            }
        });
        let e = expect_event(normalize(&raw).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Audio);
        assert_eq!(e.media_ref.as_deref(), Some("v1"));
        assert_eq!(e.metadata["voice"], json!(true));
    }

    #[test]
    fn location_contact_and_sticker() {
        let location = json!({
            "update_id": 1,
            "message": {
                "message_id": 45, "date": 0,
                "chat": { "id": 555 }, "from": { "id": 555 },
                "location": { "latitude": 52.5, "longitude": 13.4 }
            }
        });
        let e = expect_event(normalize(&location).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Location);
        assert_eq!(e.content, "52.5,13.4");

        let contact = json!({
            "update_id": 2,
            "message": {
                "message_id": 46, "date": 0,
                "chat": { "id": 555 }, "from": { "id": 555 },
                "contact": { "phone_number": "+4917012345", "first_name": "Grace" }
            }
        });
        let e = expect_event(normalize(&contact).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Contact);
        assert_eq!(e.content, "+4917012345");
        assert_eq!(e.metadata["contact_name"], json!("Grace"));

        let sticker = json!({
            "update_id": 3,
            "message": {
                "message_id": 47, "date": 0,
                "chat": { "id": 555 }, "from": { "id": 555 },
                "sticker": { "file_id": "s1", "emoji": "👍" }
            }
        });
        let e = expect_event(normalize(&sticker).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Sticker);
        assert_eq!(e.media_ref.as_deref(), Some("s1"));
    }

    #[test]
    fn unknown_subtype_is_preserved_as_unsupported() {
        let raw = json!({
            "update_id": 4,
            "message": {
                "message_id": 48, "date": 0,
                "chat": { "id": 555 }, "from": { "id": 555 },
                "caption": "poll attached",
                "poll": { "id": "p1", "question": "lunch?" }
            }
        });
        let e = expect_event(normalize(&raw).unwrap().remove(0));
        assert_eq!(e.kind, MessageKind::Unsupported);
        assert_eq!(e.content, "poll attached");
    }

    #[test]
    fn edited_message_carries_original_id() {
        let raw = json!({
            "update_id": 5,
            "edited_message": {
                "message_id": 42, "date": 1_700_000_100,
                "chat": { "id": 555 }, "from": { "id": 555 },
                "text": "Hello, edited"
            }
        });
        let e = expect_event(normalize(&raw).unwrap().remove(0));
        assert!(e.edited);
        assert_eq!(e.message_id, "42");
        assert_eq!(e.content, "Hello, edited");
    }

    #[test]
    fn reply_threading_is_extracted() {
        let raw = json!({
            "update_id": 6,
            "message": {
                "message_id": 50, "date": 0,
                "chat": { "id": 555 }, "from": { "id": 555 },
                "text": "replying",
                "reply_to_message": {
                    "message_id": 42, "date": 0, "chat": { "id": 555 }
                }
            }
        });
        let e = expect_event(normalize(&raw).unwrap().remove(0));
        assert_eq!(e.reply_to.as_deref(), Some("42"));
    }

    #[test]
    fn batch_array_isolates_bad_items() {
        let raw = json!([
            text_update(60, "one"),
            { "update_id": "not-a-number" },
            text_update(61, "three"),
        ]);
        let updates = normalize(&raw).unwrap();
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], NormalizedUpdate::Message(_)));
        assert!(matches!(updates[1], NormalizedUpdate::Malformed { .. }));
        assert!(matches!(updates[2], NormalizedUpdate::Message(_)));
    }

    #[test]
    fn non_message_update_is_ignored() {
        let raw = json!({ "update_id": 7, "my_chat_member": {} });
        let updates = normalize(&raw).unwrap();
        assert!(matches!(updates[0], NormalizedUpdate::Ignored { .. }));
    }

    #[test]
    fn scalar_payload_is_malformed() {
        assert!(normalize(&json!("boom")).is_err());
    }
}
