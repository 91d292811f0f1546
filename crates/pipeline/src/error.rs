use convoy_channels::Platform;

/// Failure while ingesting a single inbound event.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The persistence layer failed mid-pipeline. Retryable: the webhook
    /// handler answers non-2xx so the provider redelivers, and the storage
    /// upserts make the replay a no-op for whatever already committed.
    #[error("storage failure for {platform}/{platform_message_id}: {source}")]
    Storage {
        platform: Platform,
        platform_message_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl IngestError {
    #[must_use]
    pub fn storage(
        platform: Platform,
        platform_message_id: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Storage {
            platform,
            platform_message_id: platform_message_id.into(),
            source,
        }
    }
}

/// Failure on the outbound send path.
#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    /// Provider API or connector failure, returned verbatim to the caller.
    /// No automatic retry happens here.
    #[error(transparent)]
    Channel(#[from] convoy_channels::Error),

    /// The provider accepted the message but pre-registration failed.
    #[error("outbound pre-registration failed: {0}")]
    Storage(#[from] anyhow::Error),
}
