//! The client-facing delegate sink: every method is defaulted to a no-op so
//! implementors only override the events they care about.

use crate::Fix;
use crate::error::EngineError;
use crate::region::{Region, RegionState};

/// Authorization status, mutated externally (the engine never changes it
/// itself, only forwards changes a host observes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Not yet asked.
    NotDetermined,
    /// Denied by the user.
    Denied,
    /// Restricted by policy (e.g. parental controls, MDM).
    Restricted,
    /// Granted.
    Authorized,
}

/// Receives fixes, errors, and region events from a [`crate::session::Session`].
///
/// All methods default to doing nothing; implementors override only the
/// events they need.
pub trait Delegate: Send + Sync + 'static {
    /// A filtered fix was reported.
    fn on_update(&self, _fix: &Fix) {}

    /// A terminal error was reported.
    fn on_fail(&self, _error: &EngineError) {}

    /// The authorization status changed (forwarded from outside the engine).
    fn on_authorization_changed(&self, _status: AuthStatus) {}

    /// A monitored region was entered.
    fn on_enter_region(&self, _region: &Region) {}

    /// A monitored region was exited.
    fn on_exit_region(&self, _region: &Region) {}

    /// A region's containment state was determined.
    fn on_determine_state(&self, _state: RegionState, _region: &Region) {}

    /// A region could not be monitored; `region` is `None` for errors that
    /// are not specific to one region.
    fn on_monitoring_failed(&self, _region: Option<&Region>, _error: &EngineError) {}

    /// A region was successfully added for monitoring.
    fn on_start_monitoring(&self, _region: &Region) {}
}

/// A no-op delegate, useful as a placeholder before a real one is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelegate;

impl Delegate for NullDelegate {}
