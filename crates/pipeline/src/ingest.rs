use std::sync::Arc;

use tracing::{debug, warn};

use {
    convoy_channels::{
        ChannelConnector, InboundEvent, MessageEvent, MessageEventSink, NormalizedUpdate,
    },
    convoy_storage::{
        ContactStore, ConversationStore, Direction, Message, MessageStore, NewMessage,
    },
};

use crate::{
    classify::{Classifier, ContactContext},
    error::IngestError,
};

/// Maximum characters kept in conversation previews and broadcast frames.
const PREVIEW_MAX_CHARS: usize = 120;

/// Truncate message content for list views and event frames.
pub(crate) fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_MAX_CHARS).collect()
}

/// Outcome of ingesting one inbound event.
#[derive(Debug)]
pub enum IngestOutcome {
    /// First sight of this provider message id; a row was created.
    Stored(Message),
    /// Replay of an already-stored id; nothing changed.
    Duplicate(Message),
    /// An edit applied to an existing row.
    Edited(Message),
}

/// Per-delivery tally. One failing event never aborts its siblings; the
/// handler uses [`BatchReport::retryable`] to decide the webhook status.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct BatchReport {
    pub received: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub edited: usize,
    pub receipts: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub failed: usize,
}

impl BatchReport {
    /// True when at least one event hit a retryable storage failure. The
    /// provider should redeliver the whole payload; idempotent storage makes
    /// the replay safe for the events that already committed.
    pub fn retryable(&self) -> bool {
        self.failed > 0
    }
}

/// The ingestion pipeline. All dependencies are injected once at startup;
/// each run is short-lived, synchronous up to the storage commit, and safe
/// under concurrent invocation for the same identity or message id.
pub struct Ingestor {
    contacts: Arc<dyn ContactStore>,
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn MessageEventSink>,
}

impl Ingestor {
    pub fn new(
        contacts: Arc<dyn ContactStore>,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        classifier: Arc<dyn Classifier>,
        sink: Arc<dyn MessageEventSink>,
    ) -> Self {
        Self {
            contacts,
            conversations,
            messages,
            classifier,
            sink,
        }
    }

    /// Normalize and ingest one webhook delivery for `tenant_id`.
    ///
    /// A payload that fails to parse outright is counted as malformed and
    /// acknowledged — malformed input never triggers provider retries.
    pub async fn ingest_batch(
        &self,
        tenant_id: &str,
        connector: &dyn ChannelConnector,
        raw: &serde_json::Value,
    ) -> BatchReport {
        let platform = connector.platform();
        let mut report = BatchReport::default();

        let updates = match connector.normalize(raw) {
            Ok(updates) => updates,
            Err(e) => {
                warn!(tenant_id, %platform, error = %e, "dropping unparseable webhook payload");
                report.malformed += 1;
                return report;
            },
        };

        report.received = updates.len();
        for update in updates {
            match update {
                NormalizedUpdate::Message(event) => {
                    let message_id = event.message_id.clone();
                    match self.ingest_event(tenant_id, event).await {
                        Ok(IngestOutcome::Stored(_)) => report.stored += 1,
                        Ok(IngestOutcome::Duplicate(_)) => {
                            debug!(tenant_id, %platform, message_id, "duplicate delivery, no-op");
                            report.duplicates += 1;
                        },
                        Ok(IngestOutcome::Edited(_)) => report.edited += 1,
                        Err(e) => {
                            warn!(
                                tenant_id,
                                %platform,
                                message_id,
                                error = %e,
                                "event failed, signalling provider retry"
                            );
                            report.failed += 1;
                        },
                    }
                },
                NormalizedUpdate::Receipt { message_id, status } => {
                    report.receipts += 1;
                    match self.messages.mark_delivery(platform, &message_id, &status).await {
                        Ok(true) => {
                            debug!(tenant_id, %platform, message_id, status, "delivery receipt applied");
                        },
                        Ok(false) => {
                            debug!(tenant_id, %platform, message_id, "receipt for unknown message, dropped");
                        },
                        Err(e) => {
                            warn!(tenant_id, %platform, message_id, error = %e, "receipt update failed");
                            report.failed += 1;
                        },
                    }
                },
                NormalizedUpdate::Ignored { reason } => {
                    debug!(tenant_id, %platform, reason, "update ignored");
                    report.ignored += 1;
                },
                NormalizedUpdate::Malformed { detail } => {
                    warn!(tenant_id, %platform, detail, "malformed update in batch, siblings continue");
                    report.malformed += 1;
                },
            }
        }
        report
    }

    /// Run the pipeline for one canonical inbound event.
    ///
    /// Classification and fan-out happen after the message-store commit and
    /// are best-effort: their failures are logged, never surfaced, so an
    /// already-durable event is never reported as failed.
    pub async fn ingest_event(
        &self,
        tenant_id: &str,
        event: InboundEvent,
    ) -> Result<IngestOutcome, IngestError> {
        let platform = event.platform;

        if event.edited {
            match self
                .messages
                .apply_edit(platform, &event.message_id, &event.content, event.timestamp)
                .await
                .map_err(|e| IngestError::storage(platform, &event.message_id, e))?
            {
                Some(message) => {
                    self.emit(
                        tenant_id,
                        MessageEvent::MessageEdited {
                            conversation_id: message.conversation_id.clone(),
                            message_id: message.id.clone(),
                            platform,
                            preview: preview(&message.content),
                            edited_at: event.timestamp,
                        },
                    );
                    return Ok(IngestOutcome::Edited(message));
                },
                // At-least-once delivery may have dropped the original;
                // fall through and store the edited content as a fresh row.
                None => {
                    debug!(tenant_id, %platform, message_id = event.message_id,
                        "edit for unknown message, storing as new");
                },
            }
        }

        let contact = self
            .contacts
            .upsert_inbound(
                tenant_id,
                platform,
                &event.sender_id,
                &event.profile,
                event.timestamp,
            )
            .await
            .map_err(|e| IngestError::storage(platform, &event.message_id, e))?;

        let content_preview = preview(&event.content);
        let conversation = self
            .conversations
            .resolve_active(
                tenant_id,
                &contact.id,
                platform,
                &event.thread_id,
                event.timestamp,
                &content_preview,
            )
            .await
            .map_err(|e| IngestError::storage(platform, &event.message_id, e))?;

        let outcome = self
            .messages
            .insert_unique(&NewMessage {
                conversation_id: conversation.id.clone(),
                contact_id: contact.id.clone(),
                platform,
                platform_message_id: event.message_id.clone(),
                direction: Direction::Inbound,
                kind: event.kind,
                content: event.content.clone(),
                media_ref: event.media_ref.clone(),
                reply_to: event.reply_to.clone(),
                metadata: event.metadata.clone(),
                created_at: event.timestamp,
            })
            .await
            .map_err(|e| IngestError::storage(platform, &event.message_id, e))?;

        if !outcome.created {
            // Provider retry or echo of a pre-registered outbound send.
            return Ok(IngestOutcome::Duplicate(outcome.message));
        }
        let message = outcome.message;

        // Post-commit: classification deltas and fan-out. Best-effort.
        let verdict = self.classifier.classify(
            &event.content,
            &ContactContext {
                lead_score: contact.lead_score,
                lifecycle_stage: contact.lifecycle_stage.clone(),
            },
        );

        if let Some(target) = verdict.escalate_to {
            match self.conversations.escalate(&conversation.id, target).await {
                Ok(true) => self.emit(
                    tenant_id,
                    MessageEvent::ConversationEscalated {
                        conversation_id: conversation.id.clone(),
                        contact_id: contact.id.clone(),
                        priority: target.to_string(),
                    },
                ),
                Ok(false) => {},
                Err(e) => {
                    warn!(tenant_id, conversation_id = conversation.id, error = %e,
                        "priority escalation failed");
                },
            }
        }

        if verdict.score_delta != 0
            && let Err(e) = self
                .contacts
                .adjust_lead_score(&contact.id, verdict.score_delta)
                .await
        {
            warn!(tenant_id, contact_id = contact.id, error = %e, "lead-score update failed");
        }

        self.emit(
            tenant_id,
            MessageEvent::MessageStored {
                conversation_id: conversation.id.clone(),
                contact_id: contact.id.clone(),
                message_id: message.id.clone(),
                platform,
                direction: Direction::Inbound.as_str().to_string(),
                message_kind: message.kind,
                preview: content_preview,
                created_at: message.created_at,
                tags: verdict.tags,
            },
        );

        Ok(IngestOutcome::Stored(message))
    }

    /// Fire-and-forget fan-out, decoupled from the pipeline's success path.
    /// The sink contract requires implementations to swallow their own
    /// failures, and the spawned task isolates their latency.
    fn emit(&self, tenant_id: &str, event: MessageEvent) {
        let sink = Arc::clone(&self.sink);
        let tenant_id = tenant_id.to_string();
        tokio::spawn(async move {
            sink.emit(&tenant_id, event).await;
        });
    }
}
