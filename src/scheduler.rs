//! Selects the polling cadence (foreground / background / stationary) and
//! owns the repeating timer that drives it.

use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior, interval_at};

/// Cadence while in the foreground and not paused.
pub const FOREGROUND_INTERVAL: Duration = Duration::from_secs(1);
/// Cadence while background updates are allowed and not paused.
pub const BACKGROUND_INTERVAL: Duration = Duration::from_secs(30);
/// Cadence while paused (stationary), regardless of the background flag.
pub const STATIONARY_INTERVAL: Duration = Duration::from_secs(60);

/// Pick the cadence for the given mode.
#[must_use]
pub fn interval_for(allows_background: bool, paused: bool) -> Duration {
    if paused {
        STATIONARY_INTERVAL
    } else if allows_background {
        BACKGROUND_INTERVAL
    } else {
        FOREGROUND_INTERVAL
    }
}

/// Owns the repeating timer driving the session's polling cadence.
///
/// Rescheduling replaces the underlying [`Interval`] outright, rather than
/// resetting it, so the next tick fires immediately — the same contract the
/// teacher's dispatch-source timers gave by being cancelled and recreated on
/// every period change.
pub struct AdaptiveScheduler {
    period: Duration,
    timer: Interval,
}

impl std::fmt::Debug for AdaptiveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveScheduler")
            .field("period", &self.period)
            .finish()
    }
}

impl AdaptiveScheduler {
    /// Start a scheduler at the cadence implied by `allows_background` and
    /// `paused`.
    #[must_use]
    pub fn new(allows_background: bool, paused: bool) -> Self {
        let period = interval_for(allows_background, paused);
        Self {
            period,
            timer: make_timer(period),
        }
    }

    /// Current polling period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Recompute the cadence for the current mode; if it changed, cancel and
    /// recreate the timer so the new period takes effect no later than the
    /// next tick.
    pub fn reconfigure(&mut self, allows_background: bool, paused: bool) {
        let period = interval_for(allows_background, paused);
        if period != self.period {
            self.period = period;
            self.timer = make_timer(period);
        }
    }

    /// Wait for the next tick.
    pub async fn tick(&mut self) {
        self.timer.tick().await;
    }
}

fn make_timer(period: Duration) -> Interval {
    let mut timer = interval_at(tokio::time::Instant::now(), period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreground_is_one_second() {
        assert_eq!(interval_for(false, false), Duration::from_secs(1));
    }

    #[test]
    fn background_is_thirty_seconds() {
        assert_eq!(interval_for(true, false), Duration::from_secs(30));
    }

    #[test]
    fn paused_is_sixty_seconds_regardless_of_background_flag() {
        assert_eq!(interval_for(false, true), Duration::from_secs(60));
        assert_eq!(interval_for(true, true), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_changes_the_period_actually_used() {
        let mut scheduler = AdaptiveScheduler::new(false, false);
        assert_eq!(scheduler.period(), Duration::from_secs(1));

        scheduler.reconfigure(false, true);
        assert_eq!(scheduler.period(), Duration::from_secs(60));
    }
}
