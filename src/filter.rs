//! Gates whether a fresh fix is reported to the client, based on
//! great-circle distance from the last reported fix.

use crate::Fix;
use crate::geo::haversine_distance_m;

/// Sentinel meaning "distance filtering is disabled": every fix passes.
pub const DISABLED: f64 = -1.0;

/// Distance filter state: the last fix reported to the delegate and the
/// threshold below which a new fix is suppressed.
#[derive(Debug, Clone, Default)]
pub struct DistanceFilter {
    threshold_m: f64,
    last_reported: Option<Fix>,
}

impl DistanceFilter {
    /// Create a filter with the given threshold in meters (non-positive
    /// disables filtering).
    #[must_use]
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            last_reported: None,
        }
    }

    /// Change the threshold without resetting the last-reported fix.
    pub fn set_threshold(&mut self, threshold_m: f64) {
        self.threshold_m = threshold_m;
    }

    /// Current threshold, in meters.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold_m
    }

    /// Decide whether `fix` should be reported, and if so, record it as the
    /// new last-reported fix.
    pub fn admit(&mut self, fix: Fix) -> Option<Fix> {
        let passes = match &self.last_reported {
            None => true,
            Some(_) if self.threshold_m <= 0.0 => true,
            Some(last) => haversine_distance_m(last.coordinate, fix.coordinate) >= self.threshold_m,
        };

        if passes {
            self.last_reported = Some(fix.clone());
            Some(fix)
        } else {
            None
        }
    }

    /// Clear the last-reported fix, e.g. on session stop. The next admitted
    /// fix always passes.
    pub fn reset(&mut self) {
        self.last_reported = None;
    }
}
