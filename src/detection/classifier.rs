use crate::constants::DEFAULT_LOOKBACK;
use crate::detection::extrema::find_extrema;
use crate::detection::thresholds::Thresholds;
use crate::detection::types::{Extremum, History, Window};

/// Outcome of one classification pass
///
/// At most one of `peak` / `trough` is set; the value is an index into the
/// window that was classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub peak: Option<usize>,
    pub trough: Option<usize>,
}

impl Classification {
    pub fn none() -> Self {
        Self::default()
    }

    fn found(extremum: Extremum, index: usize) -> Self {
        match extremum {
            Extremum::Peak => Self {
                peak: Some(index),
                trough: None,
            },
            Extremum::Trough => Self {
                peak: None,
                trough: Some(index),
            },
        }
    }

    pub fn detected(&self) -> Option<(Extremum, usize)> {
        match (self.peak, self.trough) {
            (Some(p), _) => Some((Extremum::Peak, p)),
            (None, Some(t)) => Some((Extremum::Trough, t)),
            (None, None) => None,
        }
    }
}

/// Decide whether the newest candidate extremum in `window` is confirmed
///
/// Only the extremum awaited by `history` is considered. A candidate is
/// confirmed when it dominates the preceding `lookback` samples, rises (or
/// falls) far enough from the newest confirmed extremum of the opposite kind,
/// and lies far enough from the last record in time. The time requirement
/// only holds once the history is settled: after a restart or a forced
/// record the phase of the signal is unknown. The height requirement relaxes
/// in proportion to how long detection has been starved.
///
/// # Arguments
/// * `window` - Samples since the last event
/// * `history` - Past detections
/// * `thresholds` - Thresholds estimated from `history`
/// * `sampling_interval_ms` - Spacing of the decimated stream
pub fn classify(
    window: &Window,
    history: &History,
    thresholds: &Thresholds,
    sampling_interval_ms: f64,
) -> Classification {
    let last = history.last();
    let elapsed = (window.last().timestamp - last.timestamp) as f64;

    let bound = thresholds.time_bound();
    let relax = if bound > 0.0 && elapsed > bound {
        elapsed / bound
    } else {
        1.0
    };
    let height_limit = thresholds.amplitude.lower() / relax;
    let time_limit = thresholds.time.lower();
    let lookback = lookback_samples(thresholds, sampling_interval_ms);

    let wanted = history.awaiting();
    let amplitudes = window.amplitudes();
    let Some(&index) = find_extrema(&amplitudes, wanted).last() else {
        return Classification::none();
    };

    let candidate = window.samples()[index];
    let reference = history.last_of(wanted.opposite()).unwrap_or(last);
    let neighbourhood = &amplitudes[index.saturating_sub(lookback)..index];
    let (dominates, excursion) = match wanted {
        Extremum::Peak => (
            neighbourhood.iter().all(|&a| candidate.amplitude >= a),
            candidate.amplitude - reference.amplitude,
        ),
        Extremum::Trough => (
            neighbourhood.iter().all(|&a| candidate.amplitude <= a),
            reference.amplitude - candidate.amplitude,
        ),
    };
    let spaced =
        !history.is_settled() || (candidate.timestamp - last.timestamp) as f64 > time_limit;

    if dominates && excursion > height_limit && spaced {
        Classification::found(wanted, index)
    } else {
        Classification::none()
    }
}

/// Number of preceding samples a candidate must dominate
pub fn lookback_samples(thresholds: &Thresholds, sampling_interval_ms: f64) -> usize {
    let samples = (thresholds.time.mean / sampling_interval_ms).floor();
    if samples >= 1.0 {
        samples as usize
    } else {
        DEFAULT_LOOKBACK
    }
}
