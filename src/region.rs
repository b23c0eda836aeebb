//! Maintains a set of circular regions and their last-known inside/outside
//! state, emitting entry/exit transitions on each reported fix.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::EngineError;
use crate::geo::haversine_distance_m;
use crate::{Coordinate, Fix};

/// A named circular geographic area with independent entry/exit
/// notification flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Identifier, unique within a monitor.
    pub identifier: String,
    /// Center of the circle.
    pub center: Coordinate,
    /// Radius in meters, must be `> 0`.
    pub radius: f64,
    /// Whether entry should be reported.
    pub notify_on_entry: bool,
    /// Whether exit should be reported.
    pub notify_on_exit: bool,
}

/// Containment state of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// Containment has never been determined.
    Unknown,
    /// The last evaluated fix was inside the region.
    Inside,
    /// The last evaluated fix was outside the region.
    Outside,
}

/// An event produced by the region monitor, to be forwarded to a
/// [`crate::delegate::Delegate`] by the caller (never from under the
/// monitor's lock).
#[derive(Debug, Clone)]
pub enum RegionEvent {
    /// A monitored region was entered.
    Entered(Region),
    /// A monitored region was exited.
    Exited(Region),
    /// A region's containment state was determined on request.
    StateDetermined(RegionState, Region),
}

struct Inner {
    regions: HashMap<String, (Region, RegionState)>,
    last_fix: Option<Fix>,
}

/// Monitors a set of circular regions against the most recently reported
/// fix.
pub struct RegionMonitor {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for RegionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionMonitor").finish()
    }
}

impl Default for RegionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionMonitor {
    /// Create an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                regions: HashMap::new(),
                last_fix: None,
            }),
        }
    }

    /// Add (or replace, last-write-wins on identifier collision) a region.
    /// Its state starts `Unknown`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRegion`] if the identifier is empty or
    /// the radius is non-positive.
    pub async fn add(&self, region: Region) -> Result<(), EngineError> {
        if region.identifier.is_empty() {
            return Err(EngineError::InvalidRegion("identifier must not be empty".into()));
        }
        if !(region.radius > 0.0) {
            return Err(EngineError::InvalidRegion(format!(
                "radius must be positive, got {}",
                region.radius
            )));
        }

        let mut inner = self.inner.write().await;
        inner
            .regions
            .insert(region.identifier.clone(), (region, RegionState::Unknown));
        Ok(())
    }

    /// Remove a region by identifier; its state is discarded.
    pub async fn remove(&self, identifier: &str) {
        let mut inner = self.inner.write().await;
        inner.regions.remove(identifier);
    }

    /// Replace a region's notify flags in place, preserving its current
    /// [`RegionState`] so the next evaluation observes the new flags without
    /// losing history.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRegion`] if no region with that
    /// identifier is monitored.
    pub async fn set_notify_flags(
        &self,
        identifier: &str,
        notify_on_entry: bool,
        notify_on_exit: bool,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;
        let Some((region, _)) = inner.regions.get_mut(identifier) else {
            return Err(EngineError::InvalidRegion(format!(
                "no region named {identifier}"
            )));
        };
        region.notify_on_entry = notify_on_entry;
        region.notify_on_exit = notify_on_exit;
        Ok(())
    }

    /// Request the current determination for one monitored region: `Unknown`
    /// if no fix has ever been reported, otherwise its containment against
    /// the most recent one.
    pub async fn request_state(&self, identifier: &str) -> Option<RegionEvent> {
        let inner = self.inner.read().await;
        let (region, _) = inner.regions.get(identifier)?;

        let state = match &inner.last_fix {
            None => RegionState::Unknown,
            Some(fix) => containment(region, fix.coordinate),
        };
        Some(RegionEvent::StateDetermined(state, region.clone()))
    }

    /// Evaluate every monitored region against a newly reported fix,
    /// returning the entry/exit events to forward to the delegate, in
    /// nondeterministic-but-stable-per-call iteration order (no event for a
    /// region whose previous state was `Unknown`: that is an initial
    /// determination, not a transition).
    pub async fn on_fix_reported(&self, fix: &Fix) -> Vec<RegionEvent> {
        let mut inner = self.inner.write().await;
        inner.last_fix = Some(fix.clone());

        let mut events = Vec::new();
        for (region, state) in inner.regions.values_mut() {
            let previous = *state;
            let current = containment(region, fix.coordinate);
            *state = current;

            if previous == current || previous == RegionState::Unknown {
                continue;
            }
            match (previous, current) {
                (RegionState::Outside, RegionState::Inside) if region.notify_on_entry => {
                    events.push(RegionEvent::Entered(region.clone()));
                }
                (RegionState::Inside, RegionState::Outside) if region.notify_on_exit => {
                    events.push(RegionEvent::Exited(region.clone()));
                }
                _ => {}
            }
        }
        events
    }
}

fn containment(region: &Region, point: Coordinate) -> RegionState {
    if haversine_distance_m(region.center, point) <= region.radius {
        RegionState::Inside
    } else {
        RegionState::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_fix;

    fn sf_region(id: &str) -> Region {
        Region {
            identifier: id.to_owned(),
            center: Coordinate::new(37.7749, -122.4194),
            radius: 500.0,
            notify_on_entry: true,
            notify_on_exit: true,
        }
    }

    #[tokio::test]
    async fn invalid_region_rejected() {
        let monitor = RegionMonitor::new();
        let mut bad = sf_region("r1");
        bad.radius = 0.0;
        assert!(monitor.add(bad).await.is_err());

        let mut bad_id = sf_region("");
        bad_id.radius = 10.0;
        assert!(monitor.add(bad_id).await.is_err());
    }

    #[tokio::test]
    async fn request_state_before_any_fix_is_unknown() {
        let monitor = RegionMonitor::new();
        monitor.add(sf_region("r1")).await.unwrap();
        let event = monitor.request_state("r1").await.unwrap();
        assert!(matches!(
            event,
            RegionEvent::StateDetermined(RegionState::Unknown, _)
        ));
    }

    /// S5: region entry on crossing.
    #[tokio::test]
    async fn s5_region_entry_on_crossing() {
        let monitor = RegionMonitor::new();
        monitor.add(sf_region("r1")).await.unwrap();

        let outside = make_fix("p", 37.8500, -122.4194);
        let events1 = monitor.on_fix_reported(&outside).await;
        // Unknown -> Outside is an initial determination: silent.
        assert!(events1.is_empty());

        let inside = make_fix("p", 37.7750, -122.4194);
        let events2 = monitor.on_fix_reported(&inside).await;
        assert_eq!(events2.len(), 1);
        assert!(matches!(events2[0], RegionEvent::Entered(_)));
    }

    #[tokio::test]
    async fn no_event_when_notify_flag_disabled() {
        let monitor = RegionMonitor::new();
        let mut region = sf_region("r1");
        region.notify_on_entry = false;
        monitor.add(region).await.unwrap();

        monitor
            .on_fix_reported(&make_fix("p", 37.8500, -122.4194))
            .await;
        let events = monitor
            .on_fix_reported(&make_fix("p", 37.7750, -122.4194))
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn mutating_notify_flags_is_observed_on_next_evaluation() {
        let monitor = RegionMonitor::new();
        let mut region = sf_region("r1");
        region.notify_on_entry = false;
        monitor.add(region).await.unwrap();
        monitor
            .on_fix_reported(&make_fix("p", 37.8500, -122.4194))
            .await;

        monitor.set_notify_flags("r1", true, true).await.unwrap();

        let events = monitor
            .on_fix_reported(&make_fix("p", 37.7750, -122.4194))
            .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn removed_region_is_no_longer_evaluated() {
        let monitor = RegionMonitor::new();
        monitor.add(sf_region("r1")).await.unwrap();
        monitor.remove("r1").await;
        assert!(monitor.request_state("r1").await.is_none());
    }

    /// Region determinism (invariant 5): identical fix sequences produce
    /// identical transition event sequences.
    #[tokio::test]
    async fn region_transitions_are_deterministic() {
        let fixes = [
            make_fix("p", 37.8500, -122.4194),
            make_fix("p", 37.7750, -122.4194),
            make_fix("p", 37.8500, -122.4194),
        ];

        let run = || async {
            let monitor = RegionMonitor::new();
            monitor.add(sf_region("r1")).await.unwrap();
            let mut kinds = Vec::new();
            for fix in &fixes {
                for event in monitor.on_fix_reported(fix).await {
                    kinds.push(matches!(event, RegionEvent::Entered(_)));
                }
            }
            kinds
        };

        assert_eq!(run().await, run().await);
    }
}
