//! # Tick data model: the timing event produced by every clock.
//!
//! [`Tick`] is the single record type shared by all clocks. [`TickReason`]
//! says *why* the tick fired; [`TickStats`] is the per-epoch counter
//! snapshot a clock exposes through `stats()`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Why a tick fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickReason {
    /// A regularly scheduled interval fire.
    Interval,
    /// A compensation fire emitted after a delayed one to recover lost time.
    Catchup,
    /// A fire driven explicitly by the test clock.
    Manual,
    /// A fire driven by an external `push` through the bridge clock.
    Bridge,
}

impl TickReason {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            TickReason::Interval => "interval",
            TickReason::Catchup => "catchup",
            TickReason::Manual => "manual",
            TickReason::Bridge => "bridge",
        }
    }
}

/// A single timing event.
///
/// - `ts` is wall-clock milliseconds for real clocks and virtual
///   milliseconds for the test clock.
/// - `seq` is strictly monotonic, starting at 0 for each `start` epoch.
/// - `drift` is the signed deviation of the actual fire time from the ideal
///   fire time; present only on interval/catch-up ticks.
#[derive(Clone, Copy, Debug)]
pub struct Tick {
    /// Milliseconds since the epoch (virtual for the test clock).
    pub ts: u64,
    /// Monotonic sequence number within the current `start` epoch.
    pub seq: u64,
    /// Why this tick fired.
    pub reason: TickReason,
    /// Signed deviation from the ideal fire time, in milliseconds.
    pub drift: Option<i64>,
}

/// Per-epoch counter snapshot for a clock.
///
/// Zeroed at every `start`. Averages are computed from internal running
/// totals at snapshot time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickStats {
    /// Ticks fired this epoch.
    pub tick_count: u64,
    /// Ticks skipped by back-pressure (busy drops plus clamped intervals).
    pub dropped_ticks: u64,
    /// Handler invocations that failed.
    pub errors: u64,
    /// `ts` of the most recent tick, if any.
    pub last_tick_at: Option<u64>,
    /// Longest observed handler run, in milliseconds.
    pub max_handler_ms: u64,
    /// Mean handler run, in milliseconds.
    pub avg_handler_ms: f64,
    /// Mean absolute drift, in milliseconds.
    pub avg_drift_ms: f64,
}

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn wall_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
