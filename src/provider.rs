//! The `Provider` collaborator interface.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::Fix;

/// The failure categories a [`Provider`] can report.
///
/// This is deliberately smaller than [`crate::error::EngineError`]: a
/// provider only ever fails in one of these ways, and the engine maps each
/// onto the broader taxonomy when propagating a ladder-exhaustion error.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The backend is not reachable (daemon not running, no WiFi, ...).
    #[error("{0}")]
    Unavailable(String),
    /// The backend did not answer within its timeout.
    #[error("{0}")]
    Timeout(String),
    /// The backend answered but the payload was unparsable or incomplete.
    #[error("{0}")]
    InvalidResponse(String),
    /// The backend responded but has no position to report.
    #[error("{0}")]
    NoFix(String),
}

/// A backend able to produce a single location [`Fix`] asynchronously.
///
/// Implementations must be safe to call concurrently and must not block the
/// calling task; [`Provider::request_location`] is cancellation-safe (the
/// engine may drop its future at any await point without the provider
/// observing a half-finished request).
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// A stable identifier, unique within a process.
    fn id(&self) -> &str;

    /// The provider's nominal polling interval, used to size its cache's
    /// freshness window.
    fn polling_interval(&self) -> Duration;

    /// Request one location fix from the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] describing why no fix could be obtained.
    async fn request_location(&self) -> Result<Fix, ProviderError>;

    /// How long a caller should wait for [`Provider::request_location`]
    /// before treating it as timed out. Defaults to 30 seconds, the
    /// network-based figure; GPS-style providers should override this to 5
    /// seconds.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    /// Start the backend, if it has a notion of being started. Idempotent.
    async fn start(&self) {}

    /// Stop the backend, if it has a notion of being stopped. Idempotent.
    async fn stop(&self) {}
}
