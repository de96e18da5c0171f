//! # Drift-warning detector for interval scheduling.
//!
//! Flags sustained scheduling lag: a tick whose |drift| exceeds
//! `interval * DRIFT_WARN_RATIO` bumps a consecutive counter; any tick at or
//! below the ratio resets it. Once the counter reaches
//! [`DRIFT_WARN_THRESHOLD`] the clock's `on_drift_warning` hook fires, and
//! keeps firing while the streak continues — a single good tick is what
//! silences it, not the mere passage of time.

/// Fraction of the interval above which a tick counts as high-drift.
pub(crate) const DRIFT_WARN_RATIO: f64 = 0.8;

/// Consecutive high-drift ticks required before warning.
pub(crate) const DRIFT_WARN_THRESHOLD: u32 = 5;

/// Consecutive high-drift counter.
#[derive(Debug, Default)]
pub(crate) struct DriftMonitor {
    consecutive: u32,
}

impl DriftMonitor {
    /// Feeds one observed drift; returns `true` when the warning hook
    /// should fire for this tick.
    pub(crate) fn observe(&mut self, drift_ms: i64, interval_ms: u64) -> bool {
        let limit = interval_ms as f64 * DRIFT_WARN_RATIO;
        if drift_ms.unsigned_abs() as f64 > limit {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }
        self.consecutive >= DRIFT_WARN_THRESHOLD
    }
}
