//! Pub/sub fabric bridging server instances into one broadcast domain.

pub mod local;
#[cfg(feature = "redis-bus")]
pub mod redis;

use std::error::Error;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error as ThisError;

pub use self::local::LocalBus;
#[cfg(feature = "redis-bus")]
pub use self::redis::RedisBus;

/// Convenience alias for fallible bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Stream of raw payloads delivered to one subscription.
pub type BusStream = BoxStream<'static, String>;

/// Errors surfaced by a bus backend.
#[derive(Debug, ThisError)]
pub enum BusError {
    /// The backend could not be reached or refused the operation.
    #[error("message bus unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failing operation.
        message: String,
        /// Underlying backend error, when one exists.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl BusError {
    /// Build an [`BusError::Unavailable`] with an optional source error.
    pub fn unavailable(
        message: impl Into<String>,
        source: Option<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Unavailable {
            message: message.into(),
            source,
        }
    }
}

/// Abstraction over the pub/sub transport used for cross-instance fan-out.
///
/// Implementations must deliver a publish to every live subscription on the
/// topic, including a subscription held by the publisher itself. The relay
/// depends on that echo: locally produced events re-enter through the same
/// subscription as remote ones, so there is a single delivery path.
pub trait MessageBus: Send + Sync {
    fn publish(&self, topic: String, payload: String) -> BoxFuture<'static, BusResult<()>>;
    fn subscribe(&self, topic: String) -> BoxFuture<'static, BusResult<BusStream>>;
}
