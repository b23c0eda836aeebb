//! Promotes a session between moving and stationary based on dwell within a
//! small radius.

use std::time::SystemTime;

use crate::Fix;
use crate::geo::haversine_distance_m;

/// Radius, in meters, within which the session is considered to be dwelling
/// in one place.
pub const STATIONARY_RADIUS_M: f64 = 10.0;

/// How long the session must dwell within [`STATIONARY_RADIUS_M`] before
/// auto-pause engages.
pub const DWELL_TIMEOUT_SECS: u64 = 60;

/// Tracks whether the session should be considered paused due to dwelling.
#[derive(Debug, Clone, Default)]
pub struct StationaryDetector {
    anchor: Option<Fix>,
    anchor_started_at: Option<SystemTime>,
    paused: bool,
}

impl StationaryDetector {
    /// Whether the detector currently considers the session paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Feed a newly-reported fix. `auto_pause` is the session's
    /// `pausesAutomatically` flag; when false the detector never pauses.
    pub fn observe(&mut self, fix: &Fix, auto_pause: bool) {
        if !auto_pause {
            self.paused = false;
            return;
        }

        let Some(anchor) = &self.anchor else {
            self.set_anchor(fix);
            return;
        };

        let distance = haversine_distance_m(anchor.coordinate, fix.coordinate);
        if distance > STATIONARY_RADIUS_M {
            self.set_anchor(fix);
            return;
        }

        let anchor_started_at = self.anchor_started_at.expect("anchor implies start time");
        let dwell = fix
            .timestamp
            .duration_since(anchor_started_at)
            .unwrap_or_default();
        if dwell.as_secs() >= DWELL_TIMEOUT_SECS {
            self.paused = true;
        }
    }

    /// Clear the anchor and unpause, e.g. on session stop.
    pub fn reset(&mut self) {
        self.anchor = None;
        self.anchor_started_at = None;
        self.paused = false;
    }

    fn set_anchor(&mut self, fix: &Fix) {
        self.anchor = Some(fix.clone());
        self.anchor_started_at = Some(fix.timestamp);
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;
    use std::time::Duration;

    fn fix_at(t: SystemTime, lat: f64, lon: f64) -> Fix {
        Fix::new(
            Coordinate::new(lat, lon),
            0.0,
            5.0,
            crate::UNKNOWN,
            crate::UNKNOWN,
            crate::UNKNOWN,
            crate::UNKNOWN,
            crate::UNKNOWN,
            t,
            "p",
        )
        .unwrap()
    }

    /// S7: stationary auto-pause.
    #[test]
    fn s7_stationary_auto_pause_and_recovery() {
        let mut detector = StationaryDetector::default();
        let start = SystemTime::UNIX_EPOCH;

        for secs in 0..=61 {
            let t = start + Duration::from_secs(secs);
            detector.observe(&fix_at(t, 37.7749, -122.4194), true);
        }
        assert!(detector.is_paused());

        // ~22m away, well outside the 10m stationary radius.
        let far = fix_at(start + Duration::from_secs(62), 37.77510, -122.4194);
        detector.observe(&far, true);
        assert!(!detector.is_paused());
    }

    #[test]
    fn auto_pause_off_never_pauses() {
        let mut detector = StationaryDetector::default();
        let start = SystemTime::UNIX_EPOCH;
        for secs in 0..=120 {
            let t = start + Duration::from_secs(secs);
            detector.observe(&fix_at(t, 37.7749, -122.4194), false);
        }
        assert!(!detector.is_paused());
    }

    #[test]
    fn reset_clears_anchor_and_pause() {
        let mut detector = StationaryDetector::default();
        let start = SystemTime::UNIX_EPOCH;
        for secs in 0..=61 {
            detector.observe(&fix_at(start + Duration::from_secs(secs), 1.0, 1.0), true);
        }
        assert!(detector.is_paused());
        detector.reset();
        assert!(!detector.is_paused());
    }
}
