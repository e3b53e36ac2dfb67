//! # Dispatcher Error Types
//!
//! Two layers of errors live here:
//!
//! - [`DispatcherError`] covers every failure the dispatcher can observe while talking to
//!   the engine, the downstream API or the secret store, plus startup configuration errors.
//! - [`HandlerError`] is what a task handler hands back to the router. It makes the
//!   terminal/retryable decision explicit so the router never has to guess whether a
//!   failure should zero out the engine's retry budget or decrement it.

use thiserror::Error;

/// Dispatcher operation result type
pub type DispatcherResult<T> = Result<T, DispatcherError>;

/// Comprehensive error types for dispatcher operations
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Engine {operation} failed: {message}")]
    Engine { operation: String, message: String },

    #[error("Engine {operation} returned HTTP {status}: {message}")]
    EngineStatus {
        operation: String,
        status: u16,
        message: String,
    },

    /// Downstream API answered with something other than HTTP 200
    #[error("Invalid HTTP status-code {status}: {message}")]
    Invoke { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No mapper registered for topic '{topic}'")]
    MapperNotFound { topic: String },

    #[error("Topic '{topic}' refers to unknown mapper '{mapper}'")]
    UnknownMapper { topic: String, mapper: String },

    #[error("Secret '{reference}' could not be retrieved after {attempts} attempts")]
    SecretUnavailable { reference: String, attempts: u32 },
}

impl DispatcherError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an engine transport error for the named operation
    pub fn engine(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an engine error from a non-success HTTP status
    pub fn engine_status(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::EngineStatus {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a downstream invocation error carrying the HTTP status
    pub fn invoke(status: u16, message: impl Into<String>) -> Self {
        Self::Invoke {
            status,
            message: message.into(),
        }
    }

    /// Check if error is recoverable (worth retrying)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            DispatcherError::Http(e) => e.is_timeout() || e.is_connect(),
            DispatcherError::Engine { .. } => true,
            DispatcherError::EngineStatus { status, .. } => *status >= 500,
            DispatcherError::Invoke { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether this error is a startup/configuration problem rather than a runtime one
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DispatcherError::Configuration(_)
                | DispatcherError::MapperNotFound { .. }
                | DispatcherError::UnknownMapper { .. }
                | DispatcherError::SecretUnavailable { .. }
        )
    }
}

/// Outcome of a failed handler invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The task can never succeed; the engine is told to stop retrying
    #[error("{reason}")]
    Terminal { reason: String },

    /// The task may succeed later; the retry budget is decremented
    #[error("{reason}")]
    Retryable { reason: String, details: String },
}

impl HandlerError {
    pub fn terminal(reason: impl Into<String>) -> Self {
        Self::Terminal {
            reason: reason.into(),
        }
    }

    pub fn retryable(reason: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
            details: details.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HandlerError::Terminal { .. })
    }

    /// Short message reported to the engine as `errorMessage`
    pub fn reason(&self) -> &str {
        match self {
            HandlerError::Terminal { reason } | HandlerError::Retryable { reason, .. } => reason,
        }
    }

    /// Diagnostic detail reported to the engine as `errorDetails`
    pub fn details(&self) -> &str {
        match self {
            HandlerError::Terminal { .. } => "",
            HandlerError::Retryable { details, .. } => details,
        }
    }
}

impl From<DispatcherError> for HandlerError {
    fn from(error: DispatcherError) -> Self {
        HandlerError::Retryable {
            reason: error.to_string(),
            details: format!("{error:?}"),
        }
    }
}
