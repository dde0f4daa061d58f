//! Error types for the source/sink protocol.

use std::sync::Arc;

/// The main error type of the protocol.
///
/// Errors travel through `END` messages as payloads, so the type is cheap to
/// clone: foreign errors are shared behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A producer terminated its lifecycle with a failure
    #[error("Producer error: {0}")]
    Producer(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// `pull` was called on a consumption that is not started
    #[error("Cannot pull from source that is not started.")]
    PullNotStarted,

    /// `stop` was called on a consumption that is not started
    #[error("Cannot stop a source that is not started.")]
    StopNotStarted,

    /// A synchronous drain never received the START handshake
    #[error("Could not consume synchronously, because the source never started.")]
    NeverStarted,

    /// A synchronous drain returned before the source completed
    #[error("Could not consume, because the source never completed synchronously.")]
    NotSynchronous,

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),
}

// Convenience constructors
impl Error {
    /// Create a producer error from any error type
    pub fn producer<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Producer(Arc::new(error))
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Producer(Arc::from(e))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;
