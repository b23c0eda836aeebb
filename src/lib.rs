//! A cross-platform location engine: provider selection, fallback, caching,
//! distance filtering, stationary detection, adaptive scheduling, and
//! circular region monitoring, sitting behind a single client-facing
//! [`Session`](session::Session).
//!
//! The engine does not talk to GPS daemons, WiFi interfaces, or IP
//! geolocation services itself — it consumes any number of
//! [`Provider`](provider::Provider) implementations and arbitrates between
//! them. Wiring up a real GPS/WiFi/IP backend, a geocoding HTTP client, or a
//! client-facing facade that imitates a specific platform API is left to the
//! embedding application.

#![deny(missing_debug_implementations)]

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Great-circle distance and bearing calculations.
pub mod geo;

/// The `Provider` trait and the errors a provider can report.
pub mod provider;

/// Per-provider freshness cache.
pub mod cache;

/// Accuracy-tier provider registry and fallback ladder.
pub mod registry;

/// Distance-based fix filtering.
pub mod filter;

/// Stationary detection.
pub mod stationary;

/// Adaptive polling-interval scheduler.
pub mod scheduler;

/// Circular region monitoring.
pub mod region;

/// The client-facing delegate sink.
pub mod delegate;

/// The `Session` facade and its lifecycle.
pub mod session;

/// The shared error taxonomy.
pub mod error;

/// In-memory `Provider` test doubles used by this crate's own tests.
pub mod testutil;

pub use error::EngineError;

/// A latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, normally in `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, normally in `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// The sentinel "invalid" coordinate: never reported to a delegate.
    pub const INVALID: Coordinate = Coordinate {
        latitude: f64::NAN,
        longitude: f64::NAN,
    };

    /// Construct a coordinate from degrees.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// A coordinate is valid iff neither field is `NaN`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }
}

/// Sentinel value meaning "unknown/invalid" for optional numeric fix fields.
pub const UNKNOWN: f64 = -1.0;

/// An immutable geospatial sample produced by a [`Provider`](provider::Provider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// The sampled coordinate.
    pub coordinate: Coordinate,
    /// Altitude in meters.
    pub altitude: f64,
    /// Horizontal accuracy in meters, `>= 0`.
    pub horizontal_accuracy: f64,
    /// Vertical accuracy in meters, `>= 0` or [`UNKNOWN`].
    pub vertical_accuracy: f64,
    /// Course in degrees, `[0, 359.999]`, or [`UNKNOWN`].
    pub course: f64,
    /// Course accuracy in degrees, `>= 0` or [`UNKNOWN`].
    pub course_accuracy: f64,
    /// Speed in meters per second, `>= 0` or [`UNKNOWN`].
    pub speed: f64,
    /// Speed accuracy in meters per second, `>= 0` or [`UNKNOWN`].
    pub speed_accuracy: f64,
    /// Monotonic wall-clock time at which the fix was obtained.
    pub timestamp: SystemTime,
    /// Identifier of the provider that produced this fix.
    pub source: String,
}

impl Fix {
    /// Construct a fix, rejecting an invalid (NaN) coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidFix`] if `coordinate` is not
    /// [`Coordinate::is_valid`].
    pub fn new(
        coordinate: Coordinate,
        altitude: f64,
        horizontal_accuracy: f64,
        vertical_accuracy: f64,
        course: f64,
        course_accuracy: f64,
        speed: f64,
        speed_accuracy: f64,
        timestamp: SystemTime,
        source: impl Into<String>,
    ) -> Result<Self, EngineError> {
        if !coordinate.is_valid() {
            return Err(EngineError::InvalidFix);
        }
        Ok(Self {
            coordinate,
            altitude,
            horizontal_accuracy,
            vertical_accuracy,
            course,
            course_accuracy,
            speed,
            speed_accuracy,
            timestamp,
            source: source.into(),
        })
    }
}

/// A discrete, totally-ordered category of expected horizontal accuracy,
/// most accurate first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    /// Target accuracy <= 0.5 m.
    Navigation,
    /// Target accuracy <= 5 m.
    Best,
    /// Target accuracy <= 10 m.
    TenMeters,
    /// Target accuracy <= 100 m.
    HundredMeters,
    /// Target accuracy <= 1 km.
    Kilometer,
    /// Target accuracy <= 3 km.
    ThreeKilometers,
}

impl AccuracyTier {
    /// All six tiers, most accurate first.
    pub const ALL: [AccuracyTier; 6] = [
        AccuracyTier::Navigation,
        AccuracyTier::Best,
        AccuracyTier::TenMeters,
        AccuracyTier::HundredMeters,
        AccuracyTier::Kilometer,
        AccuracyTier::ThreeKilometers,
    ];

    /// Map a desired numeric horizontal accuracy (in meters) to the nearest
    /// tier whose target is `<=` the requested value, defaulting to the
    /// coarsest tier if none matches.
    #[must_use]
    pub fn nearest_for_meters(meters: f64) -> AccuracyTier {
        const TARGETS: [(AccuracyTier, f64); 6] = [
            (AccuracyTier::Navigation, 0.5),
            (AccuracyTier::Best, 5.0),
            (AccuracyTier::TenMeters, 10.0),
            (AccuracyTier::HundredMeters, 100.0),
            (AccuracyTier::Kilometer, 1_000.0),
            (AccuracyTier::ThreeKilometers, 3_000.0),
        ];
        TARGETS
            .iter()
            .find(|(_, target)| *target >= meters)
            .map_or(AccuracyTier::ThreeKilometers, |(tier, _)| *tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_coordinate_is_never_constructible_as_a_fix() {
        let err = Fix::new(
            Coordinate::INVALID,
            0.0,
            0.0,
            UNKNOWN,
            UNKNOWN,
            UNKNOWN,
            UNKNOWN,
            UNKNOWN,
            SystemTime::now(),
            "test",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidFix));
    }

    #[test]
    fn accuracy_tiers_are_totally_ordered_most_accurate_first() {
        assert!(AccuracyTier::Navigation < AccuracyTier::Best);
        assert!(AccuracyTier::Best < AccuracyTier::TenMeters);
        assert!(AccuracyTier::Kilometer < AccuracyTier::ThreeKilometers);
    }

    #[test]
    fn nearest_tier_defaults_to_coarsest() {
        assert_eq!(AccuracyTier::nearest_for_meters(0.1), AccuracyTier::Navigation);
        assert_eq!(AccuracyTier::nearest_for_meters(7.0), AccuracyTier::TenMeters);
        assert_eq!(
            AccuracyTier::nearest_for_meters(10_000.0),
            AccuracyTier::ThreeKilometers
        );
    }
}
