//! Empirical tuning constants for the adaptive detector
//!
//! None of these values has a first-principles derivation; they were tuned on
//! respiration and cardiac recordings and may need retuning for other signals.

/// Differences further than this many standard deviations from their mean are
/// dropped before thresholds are estimated. Guards against gaps left by signal
/// dropout.
pub const OUTLIER_CUTOFF_STD: f64 = 3.0;

/// Multiplier applied to the weighted standard deviation once enough history
/// exists to trust it.
pub const DISPERSION_MULTIPLIER: f64 = 2.5;

/// Qualifying history records required before the variance estimate is used.
/// Below this the dispersion is taken as half the mean.
pub const MIN_RECORDS_FOR_VARIANCE: usize = 20;

/// Weight of the oldest peak-to-trough difference.
pub const OLDEST_WEIGHT: f64 = 1.0;

/// Weight of the newest peak-to-trough difference.
pub const NEWEST_WEIGHT: f64 = 10.0;

/// Lookback (in samples) used when the time threshold yields none.
pub const DEFAULT_LOOKBACK: usize = 5;

/// A detection within this many trailing window samples counts as real-time.
///
/// The starvation timeout also allows this many samples for a confirmation.
pub const REALTIME_TAIL: usize = 2;

/// Alternating placeholder records a fresh history starts with.
pub const PLACEHOLDER_RECORDS: usize = 4;

/// Minimum standard deviation treated as non-zero when normalizing a window.
pub const NORMALIZE_EPSILON: f64 = 1e-12;
