//! Error taxonomy shared by every component of the engine.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors the engine can surface to a [`crate::delegate::Delegate`] or
/// return from a one-shot call.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The registry has no provider for the requested tier, nor for any tier
    /// on its fallback ladder.
    #[error("no provider registered for the requested accuracy tier")]
    NoProviderForAccuracy,

    /// A specific provider is not reachable.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider did not answer within its timeout.
    #[error("provider timed out: {0}")]
    ProviderTimeout(String),

    /// A provider answered with an unparsable or incomplete payload.
    #[error("provider returned an invalid response: {0}")]
    ProviderInvalidResponse(String),

    /// A provider responded but has no position to report.
    #[error("provider has no fix: {0}")]
    ProviderNoFix(String),

    /// The fallback ladder was exhausted; carries the last provider error.
    #[error("all providers in the fallback ladder failed: {source}")]
    FailedAllProviders {
        /// The error returned by the last provider tried.
        source: ProviderError,
    },

    /// A region could not be added: non-positive radius, a duplicate
    /// identifier, or an unsupported shape.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// A `Fix` was constructed with an invalid (NaN) coordinate.
    #[error("invalid coordinate")]
    InvalidFix,

    /// The operation was cancelled by `stop()` or by a superseding request.
    ///
    /// Never handed to a [`crate::delegate::Delegate`]; absorbed by the
    /// cancelling caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg) => Self::ProviderUnavailable(msg),
            ProviderError::Timeout(msg) => Self::ProviderTimeout(msg),
            ProviderError::InvalidResponse(msg) => Self::ProviderInvalidResponse(msg),
            ProviderError::NoFix(msg) => Self::ProviderNoFix(msg),
        }
    }
}
