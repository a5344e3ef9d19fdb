//! Offline seeding of the detection history from a calibration recording.

use crate::config::DetectionRate;
use crate::detection::extrema::find_extrema_above;
use crate::detection::types::{DetectionKind, DetectionRecord, Extremum, History, Sample};
use crate::error::{PeakError, Result};

/// Batch peak finding over a complete recording
pub trait BatchPeakFinder {
    /// Find peak and trough indices in `signal`, each ascending
    ///
    /// # Arguments
    /// * `signal` - Evenly spaced amplitudes
    /// * `interval_ms` - Spacing between two amplitudes
    fn find(&self, signal: &[f64], interval_ms: f64) -> Result<(Vec<usize>, Vec<usize>)>;
}

/// Derivative sign-change finder with a height threshold and minimum spacing
///
/// When two extrema of the same kind lie closer than the minimum spacing, the
/// more pronounced one is kept.
pub struct DerivativePeakFinder {
    height_threshold: f64,
    min_distance_ms: i64,
}

impl DerivativePeakFinder {
    pub fn new(height_threshold: f64, min_distance_ms: i64) -> Self {
        Self {
            height_threshold,
            min_distance_ms,
        }
    }
}

impl BatchPeakFinder for DerivativePeakFinder {
    fn find(&self, signal: &[f64], interval_ms: f64) -> Result<(Vec<usize>, Vec<usize>)> {
        if interval_ms <= 0.0 {
            return Err(PeakError::Config(format!(
                "sample interval must be positive, got {interval_ms}"
            )));
        }
        let min_distance = (self.min_distance_ms as f64 / interval_ms).round() as usize;

        let peaks = find_extrema_above(signal, Extremum::Peak, self.height_threshold)?;
        let troughs = find_extrema_above(signal, Extremum::Trough, self.height_threshold)?;

        Ok((
            filter_by_distance(&peaks, signal, min_distance, Extremum::Peak),
            filter_by_distance(&troughs, signal, min_distance, Extremum::Trough),
        ))
    }
}

/// Keep the most pronounced extrema so none are closer than `min_distance`
fn filter_by_distance(
    indices: &[usize],
    signal: &[f64],
    min_distance: usize,
    kind: Extremum,
) -> Vec<usize> {
    if min_distance <= 1 {
        return indices.to_vec();
    }

    let mut by_height = indices.to_vec();
    by_height.sort_by(|&a, &b| {
        let order = signal[b].total_cmp(&signal[a]);
        match kind {
            Extremum::Peak => order,
            Extremum::Trough => order.reverse(),
        }
    });

    let mut kept: Vec<usize> = Vec::with_capacity(by_height.len());
    for idx in by_height {
        if kept.iter().all(|&k| k.abs_diff(idx) >= min_distance) {
            kept.push(idx);
        }
    }
    kept.sort_unstable();
    kept
}

/// Decimate `samples` so consecutive timestamps are at least one detection
/// interval apart
///
/// Recordings already at or below `target` are returned unchanged.
pub fn downsample(samples: &[Sample], target: DetectionRate) -> Vec<Sample> {
    let Some(rate) = recording_rate(samples) else {
        return samples.to_vec();
    };
    if rate <= target.as_hz() {
        return samples.to_vec();
    }

    let interval = target.interval_ms();
    let mut out: Vec<Sample> = Vec::with_capacity(samples.len());
    for &sample in samples {
        match out.last() {
            Some(prev) if (sample.timestamp as f64) < prev.timestamp as f64 + interval => {}
            _ => out.push(sample),
        }
    }
    out
}

/// Mean sampling rate of a recording in Hz
fn recording_rate(samples: &[Sample]) -> Option<f64> {
    let (first, last) = (samples.first()?, samples.last()?);
    let span = (last.timestamp - first.timestamp) as f64;
    if samples.len() < 2 || span <= 0.0 {
        return None;
    }
    Some(1000.0 * (samples.len() - 1) as f64 / span)
}

/// Seed a history from a calibration recording
///
/// Returns `None` (degraded baseline) when no finder is available, the finder
/// fails, or fewer than one peak/trough pair is found. The caller then starts
/// from placeholders.
///
/// # Arguments
/// * `calibration` - Recorded samples of the watched channel
/// * `target` - Live detection rate; faster recordings are decimated to it
/// * `finder` - Batch peak finder, if one is available
pub fn seed(
    calibration: &[Sample],
    target: DetectionRate,
    finder: Option<&dyn BatchPeakFinder>,
) -> Option<History> {
    let Some(finder) = finder else {
        log::warn!("No batch peak finder available, ignoring baseline");
        return None;
    };

    let clean: Vec<Sample> = calibration
        .iter()
        .copied()
        .filter(|s| s.amplitude.is_finite())
        .collect();
    let series = downsample(&clean, target);
    let Some(rate) = recording_rate(&series) else {
        log::warn!(
            "Baseline too short ({} usable samples), ignoring it",
            series.len()
        );
        return None;
    };

    let amplitudes: Vec<f64> = series.iter().map(|s| s.amplitude).collect();
    let (peaks, troughs) = match finder.find(&amplitudes, 1000.0 / rate) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("Baseline peak finding failed: {}", e);
            return None;
        }
    };

    let mut records: Vec<DetectionRecord> = peaks
        .iter()
        .map(|&i| {
            DetectionRecord::new(DetectionKind::Peak, series[i].timestamp, series[i].amplitude)
        })
        .chain(troughs.iter().map(|&i| {
            DetectionRecord::new(DetectionKind::Trough, series[i].timestamp, series[i].amplitude)
        }))
        .collect();
    records.sort_by_key(|r| r.timestamp);

    let mut records = alternate(records);
    let peak_count = records.iter().filter(|r| r.kind == DetectionKind::Peak).count();
    let trough_count = records.len() - peak_count;
    if peak_count.min(trough_count) == 0 {
        log::warn!(
            "Baseline yielded {} peaks and {} troughs, need at least one pair",
            peak_count,
            trough_count
        );
        return None;
    }
    if peak_count != trough_count {
        records.remove(0);
    }

    log::info!(
        "Baseline seeded with {} peak/trough pairs from {} samples",
        records.len() / 2,
        series.len()
    );
    Some(History::from_records(records))
}

/// Merge runs of the same kind, keeping the most pronounced record of each run
fn alternate(records: Vec<DetectionRecord>) -> Vec<DetectionRecord> {
    let mut out: Vec<DetectionRecord> = Vec::with_capacity(records.len());
    for record in records {
        match out.last_mut() {
            Some(prev) if prev.kind == record.kind => {
                let replace = match record.kind {
                    DetectionKind::Peak => record.amplitude > prev.amplitude,
                    _ => record.amplitude < prev.amplitude,
                };
                if replace {
                    *prev = record;
                }
            }
            _ => out.push(record),
        }
    }
    out
}
