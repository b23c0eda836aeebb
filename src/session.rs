//! The client-facing facade: configuration, lifecycle, and the delegate
//! sink, tying together the registry, distance filter, stationary detector,
//! adaptive scheduler, and region monitor.

use std::sync::{Arc, Mutex as StdMutex};

use log::error;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;

use crate::delegate::Delegate;
use crate::error::EngineError;
use crate::filter::DistanceFilter;
use crate::provider::Provider;
use crate::region::{Region, RegionEvent, RegionMonitor};
use crate::registry::ProviderRegistry;
use crate::scheduler::{AdaptiveScheduler, interval_for};
use crate::stationary::StationaryDetector;
use crate::{AccuracyTier, Fix};

/// Client-set configuration, mutated through [`Session`]'s setters.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Desired accuracy tier; the registry's fallback ladder starts here.
    pub desired_accuracy: AccuracyTier,
    /// Distance filter threshold in meters; [`crate::filter::DISABLED`]
    /// disables filtering.
    pub distance_filter_m: f64,
    /// Whether updates may be delivered while the host is backgrounded.
    pub allows_background: bool,
    /// Whether the stationary detector may auto-pause the session.
    pub pauses_automatically: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            desired_accuracy: AccuracyTier::Best,
            distance_filter_m: crate::filter::DISABLED,
            allows_background: false,
            pauses_automatically: true,
        }
    }
}

/// The session's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No updates are being produced.
    Idle,
    /// Updates are running at the foreground or background cadence.
    Running,
    /// Updates are running at the stationary cadence; the stationary
    /// detector decided the session is dwelling in place.
    Paused,
}

struct ControlState {
    lifecycle: Lifecycle,
    config: SessionConfig,
    filter: DistanceFilter,
    stationary: StationaryDetector,
}

/// What a processed fix should tell the delegate. Returned by the methods
/// that hold `control`'s lock so the actual delegate calls can happen after
/// every lock guard involved has been dropped.
struct Emission {
    region_events: Vec<RegionEvent>,
    reported_fix: Option<Fix>,
}

impl Emission {
    fn empty() -> Self {
        Self {
            region_events: Vec::new(),
            reported_fix: None,
        }
    }
}

/// The client-facing location session.
pub struct Session {
    registry: ProviderRegistry,
    regions: RegionMonitor,
    delegate: StdMutex<Option<Arc<dyn Delegate>>>,
    control: AsyncMutex<ControlState>,
    timer_task: StdMutex<Option<JoinHandle<()>>>,
    inflight_request: StdMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish()
    }
}

impl Session {
    /// Create a new, idle session over `providers`, with an optional
    /// initial delegate.
    #[must_use]
    pub fn new(
        providers: Vec<(AccuracyTier, Arc<dyn Provider>)>,
        delegate: Option<Arc<dyn Delegate>>,
    ) -> Arc<Self> {
        Self::with_config(providers, delegate, SessionConfig::default())
    }

    /// Create a new, idle session with explicit initial configuration.
    #[must_use]
    pub fn with_config(
        providers: Vec<(AccuracyTier, Arc<dyn Provider>)>,
        delegate: Option<Arc<dyn Delegate>>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: ProviderRegistry::new(providers),
            regions: RegionMonitor::new(),
            delegate: StdMutex::new(delegate),
            control: AsyncMutex::new(ControlState {
                lifecycle: Lifecycle::Idle,
                filter: DistanceFilter::new(config.distance_filter_m),
                stationary: StationaryDetector::default(),
                config,
            }),
            timer_task: StdMutex::new(None),
            inflight_request: StdMutex::new(None),
        })
    }

    /// Replace the delegate.
    pub fn set_delegate(&self, delegate: Arc<dyn Delegate>) {
        *self.delegate.lock().expect("poisoned") = Some(delegate);
    }

    /// Clear the delegate.
    pub fn clear_delegate(&self) {
        *self.delegate.lock().expect("poisoned") = None;
    }

    /// Current lifecycle state.
    pub async fn lifecycle(&self) -> Lifecycle {
        self.control.lock().await.lifecycle
    }

    /// Current configuration (round-trips whatever was last set).
    pub async fn config(&self) -> SessionConfig {
        self.control.lock().await.config.clone()
    }

    /// Set the desired accuracy tier. Takes effect no later than the next
    /// timer tick.
    pub async fn set_desired_accuracy(&self, tier: AccuracyTier) {
        self.control.lock().await.config.desired_accuracy = tier;
    }

    /// Set the distance filter threshold in meters
    /// ([`crate::filter::DISABLED`] to disable).
    pub async fn set_distance_filter(&self, meters: f64) {
        let mut control = self.control.lock().await;
        control.config.distance_filter_m = meters;
        control.filter.set_threshold(meters);
    }

    /// Set whether updates may be delivered in the background.
    pub async fn set_allows_background(&self, allowed: bool) {
        self.control.lock().await.config.allows_background = allowed;
    }

    /// Set whether the stationary detector may auto-pause the session.
    pub async fn set_pauses_automatically(&self, enabled: bool) {
        self.control.lock().await.config.pauses_automatically = enabled;
    }

    /// Forward an externally-observed authorization change. The engine
    /// never mutates authorization itself.
    pub fn notify_authorization_changed(&self, status: crate::delegate::AuthStatus) {
        if let Some(delegate) = self.current_delegate() {
            delegate.on_authorization_changed(status);
        }
    }

    /// Idempotently (re)arm the timer at the current cadence. Calling this
    /// `k >= 1` times without an intervening `stop` produces the same
    /// cadence as calling it once.
    pub async fn start_updating_location(self: &Arc<Self>) {
        {
            let mut guard = self.timer_task.lock().expect("poisoned");
            if guard.as_ref().is_some_and(|h| !h.is_finished()) {
                return;
            }
            *guard = None;
        }

        {
            let mut control = self.control.lock().await;
            if control.lifecycle == Lifecycle::Idle {
                control.lifecycle = Lifecycle::Running;
            }
        }

        let session = Arc::clone(self);
        let handle = tokio::spawn(async move { Session::run_ticker(session).await });
        *self.timer_task.lock().expect("poisoned") = Some(handle);
    }

    /// Cancel the timer and any in-flight `requestLocation()`, clear the
    /// last-reported fix and stationary anchor, and return to `Idle`.
    /// Monitored region states are preserved.
    pub async fn stop_updating_location(&self) {
        if let Some(handle) = self.timer_task.lock().expect("poisoned").take() {
            handle.abort();
        }
        if let Some(handle) = self.inflight_request.lock().expect("poisoned").take() {
            handle.abort();
        }

        let mut control = self.control.lock().await;
        control.lifecycle = Lifecycle::Idle;
        control.filter.reset();
        control.stationary.reset();
    }

    /// Run the fallback ladder exactly once, apply the distance filter,
    /// evaluate regions, and emit one `OnUpdate`/region events or one
    /// `OnFail`.
    ///
    /// If the distance filter suppresses the fix, no event is emitted for
    /// this call and `Ok` is still returned with the (unfiltered) fix, since
    /// the caller explicitly asked for one.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`EngineError`] from the fallback ladder, or
    /// [`EngineError::Cancelled`] if a concurrent `stop()` aborted this
    /// request.
    pub async fn request_location(self: &Arc<Self>) -> Result<Fix, EngineError> {
        let (tx, rx) = oneshot::channel();
        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = session.run_one_shot().await;
            let _ = tx.send(result);
        });
        *self.inflight_request.lock().expect("poisoned") = Some(handle);

        rx.await.unwrap_or(Err(EngineError::Cancelled))
    }

    /// Start monitoring a region. Emits `OnStartMonitoring` on success or
    /// `OnMonitoringFailed` on failure.
    pub async fn start_monitoring(&self, region: Region) {
        let result = self.regions.add(region.clone()).await;
        match result {
            Ok(()) => {
                if let Some(delegate) = self.current_delegate() {
                    delegate.on_start_monitoring(&region);
                }
            }
            Err(err) => {
                if let Some(delegate) = self.current_delegate() {
                    delegate.on_monitoring_failed(Some(&region), &err);
                }
            }
        }
    }

    /// Stop monitoring a region by identifier.
    pub async fn stop_monitoring(&self, identifier: &str) {
        self.regions.remove(identifier).await;
    }

    /// Request the current determination for a monitored region, emitting
    /// `OnDetermineState`.
    pub async fn request_state(&self, identifier: &str) {
        if let Some(RegionEvent::StateDetermined(state, region)) =
            self.regions.request_state(identifier).await
        {
            if let Some(delegate) = self.current_delegate() {
                delegate.on_determine_state(state, &region);
            }
        }
    }

    fn current_delegate(&self) -> Option<Arc<dyn Delegate>> {
        self.delegate.lock().expect("poisoned").clone()
    }

    async fn run_ticker(self: Arc<Self>) {
        let (allows_background, paused) = {
            let control = self.control.lock().await;
            (
                control.config.allows_background,
                control.stationary.is_paused(),
            )
        };
        let mut scheduler = AdaptiveScheduler::new(allows_background, paused);

        loop {
            scheduler.tick().await;

            match self.run_tick_cycle().await {
                Ok((emission, allows_background, paused)) => {
                    scheduler.reconfigure(allows_background, paused);
                    self.dispatch(emission);
                }
                Err(err) => {
                    error!("fallback ladder exhausted: {err}");
                    if let Some(delegate) = self.current_delegate() {
                        delegate.on_fail(&err);
                    }
                }
            }
        }
    }

    /// Fetch one fix via the fallback ladder for the currently-configured
    /// tier, process it, and report back the updated cadence inputs so the
    /// ticker can reconfigure itself.
    async fn run_tick_cycle(&self) -> Result<(Emission, bool, bool), EngineError> {
        let tier = self.control.lock().await.config.desired_accuracy;
        let fix = self.registry.request_with_fallback(tier).await?;
        let emission = self.process_fix_for_ticker(fix).await;

        let control = self.control.lock().await;
        Ok((
            emission,
            control.config.allows_background,
            control.stationary.is_paused(),
        ))
    }

    /// A one-shot `requestLocation()`: per spec, any state transitions
    /// unchanged. Runs the fallback ladder, the distance filter, and region
    /// evaluation only; the stationary detector and `lifecycle` belong to
    /// the continuous session and are never touched here.
    async fn run_one_shot(self: Arc<Self>) -> Result<Fix, EngineError> {
        let tier = self.control.lock().await.config.desired_accuracy;
        let fix = self.registry.request_with_fallback(tier).await?;
        let emission = self.process_fix(fix.clone()).await;
        self.dispatch(emission);
        Ok(fix)
    }

    /// Gate `fix` through the distance filter and, if admitted, evaluate
    /// regions. Returns what the caller should tell the delegate. Shared by
    /// both the ticker and one-shot paths.
    async fn process_fix(&self, fix: Fix) -> Emission {
        let admitted = {
            let mut control = self.control.lock().await;
            control.filter.admit(fix.clone())
        };

        let Some(fix) = admitted else {
            return Emission::empty();
        };

        let region_events = self.regions.on_fix_reported(&fix).await;
        Emission {
            region_events,
            reported_fix: Some(fix),
        }
    }

    /// Ticker-only variant of [`Session::process_fix`]: additionally feeds
    /// the stationary detector and moves `lifecycle` between `Running` and
    /// `Paused`, since only the continuous session has a dwell anchor to
    /// maintain.
    async fn process_fix_for_ticker(&self, fix: Fix) -> Emission {
        let admitted = {
            let mut control = self.control.lock().await;
            let admitted = control.filter.admit(fix.clone());
            if admitted.is_some() {
                let auto_pause = control.config.pauses_automatically;
                control.stationary.observe(&fix, auto_pause);
                if control.lifecycle != Lifecycle::Idle {
                    control.lifecycle = if control.stationary.is_paused() {
                        Lifecycle::Paused
                    } else {
                        Lifecycle::Running
                    };
                }
            }
            admitted
        };

        let Some(fix) = admitted else {
            return Emission::empty();
        };

        let region_events = self.regions.on_fix_reported(&fix).await;
        Emission {
            region_events,
            reported_fix: Some(fix),
        }
    }

    /// Deliver an [`Emission`]: all region callbacks for the fix precede its
    /// location callback.
    fn dispatch(&self, emission: Emission) {
        let Some(delegate) = self.current_delegate() else {
            return;
        };

        for event in &emission.region_events {
            match event {
                RegionEvent::Entered(region) => delegate.on_enter_region(region),
                RegionEvent::Exited(region) => delegate.on_exit_region(region),
                RegionEvent::StateDetermined(state, region) => {
                    delegate.on_determine_state(*state, region);
                }
            }
        }

        if let Some(fix) = &emission.reported_fix {
            delegate.on_update(fix);
        }
    }
}

/// Pick the scheduler cadence a session would use right now, exposed for
/// callers that want to display it without reaching into the ticker task.
#[must_use]
pub fn current_cadence(allows_background: bool, paused: bool) -> std::time::Duration {
    interval_for(allows_background, paused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::CountingProvider;
    use std::sync::Mutex as StdSyncMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingDelegate {
        updates: StdSyncMutex<Vec<Fix>>,
        fails: StdSyncMutex<Vec<String>>,
    }

    impl Delegate for RecordingDelegate {
        fn on_update(&self, fix: &Fix) {
            self.updates.lock().unwrap().push(fix.clone());
        }

        fn on_fail(&self, error: &EngineError) {
            self.fails.lock().unwrap().push(error.to_string());
        }
    }

    #[tokio::test]
    async fn configuration_round_trips() {
        let session = Session::new(vec![], None);
        session.set_desired_accuracy(AccuracyTier::Navigation).await;
        session.set_distance_filter(42.0).await;
        session.set_allows_background(true).await;
        session.set_pauses_automatically(false).await;

        let config = session.config().await;
        assert_eq!(config.desired_accuracy, AccuracyTier::Navigation);
        assert_eq!(config.distance_filter_m, 42.0);
        assert!(config.allows_background);
        assert!(!config.pauses_automatically);
    }

    #[tokio::test]
    async fn starting_k_times_is_idempotent() {
        let provider: Arc<dyn Provider> =
            Arc::new(CountingProvider::new("p", Duration::from_millis(5)));
        let session = Session::new(vec![(AccuracyTier::Best, provider)], None);

        session.start_updating_location().await;
        session.start_updating_location().await;
        session.start_updating_location().await;

        assert_eq!(session.lifecycle().await, Lifecycle::Running);
        session.stop_updating_location().await;
        assert_eq!(session.lifecycle().await, Lifecycle::Idle);
    }

    #[tokio::test]
    async fn request_location_reports_no_provider_for_accuracy() {
        let session = Session::new(vec![], None);
        let err = session.request_location().await.unwrap_err();
        assert!(matches!(err, EngineError::NoProviderForAccuracy));
    }

    #[tokio::test]
    async fn request_location_emits_update_to_delegate() {
        let provider: Arc<dyn Provider> =
            Arc::new(CountingProvider::new("p", Duration::from_secs(60)));
        let delegate = Arc::new(RecordingDelegate::default());
        let session = Session::new(
            vec![(AccuracyTier::Best, provider)],
            Some(delegate.clone()),
        );

        let fix = session.request_location().await.unwrap();
        assert_eq!(fix.source, "p");
        assert_eq!(delegate.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_clears_filter_so_next_fix_always_passes() {
        let provider: Arc<dyn Provider> =
            Arc::new(CountingProvider::new("p", Duration::from_secs(60)));
        let session = Session::new(vec![(AccuracyTier::Best, provider)], None);
        session.set_distance_filter(10_000_000.0).await;

        session.request_location().await.unwrap();
        session.stop_updating_location().await;

        // Filter was reset; an identical fix should pass again.
        let fix = session.request_location().await.unwrap();
        assert_eq!(fix.source, "p");
    }
}
