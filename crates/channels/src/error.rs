use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across connector traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// No connector is registered for the requested platform.
    #[error("no connector for platform: {platform}")]
    UnknownPlatform { platform: String },

    /// The connector has no outbound adapter (receive-only account).
    #[error("channel cannot send: {message}")]
    SendUnavailable { message: String },

    /// Provider API rejected the request. Carries the provider's native
    /// error code and description verbatim.
    #[error("provider error: {message}")]
    Provider {
        code: Option<String>,
        message: String,
    },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_platform(platform: impl std::fmt::Display) -> Self {
        Self::UnknownPlatform {
            platform: platform.to_string(),
        }
    }

    #[must_use]
    pub fn send_unavailable(message: impl std::fmt::Display) -> Self {
        Self::SendUnavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn provider(code: Option<String>, message: impl std::fmt::Display) -> Self {
        Self::Provider {
            code,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
