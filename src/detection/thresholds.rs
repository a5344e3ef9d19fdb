use crate::constants::{
    DISPERSION_MULTIPLIER, MIN_RECORDS_FOR_VARIANCE, NEWEST_WEIGHT, OLDEST_WEIGHT,
    OUTLIER_CUTOFF_STD,
};
use crate::detection::types::{DetectionKind, DetectionRecord, History};

/// Central value and spread along one axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    pub dispersion: f64,
}

impl Estimate {
    /// Lower edge of the acceptance band
    pub fn lower(&self) -> f64 {
        self.mean - self.dispersion
    }

    /// Upper edge of the acceptance band
    pub fn upper(&self) -> f64 {
        self.mean + self.dispersion
    }
}

/// Detection thresholds derived from the history
///
/// `time` is the typical peak-to-trough spacing in milliseconds, `amplitude`
/// the typical peak-to-trough height. The default (all zeros) means no
/// peak/trough pair has been confirmed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub time: Estimate,
    pub amplitude: Estimate,
}

impl Thresholds {
    /// Time since the last event after which detection is considered starved
    pub fn time_bound(&self) -> f64 {
        self.time.upper()
    }

    /// Whether the thresholds were estimated from at least one real pair
    pub fn is_informed(&self) -> bool {
        self.time_bound() > 0.0
    }
}

/// Estimate time and amplitude thresholds from confirmed detections
///
/// Peaks and troughs are paired most-recent-first and their differences are
/// trimmed of outliers, then averaged with linearly increasing weights so the
/// newest cycles count most.
pub fn estimate_thresholds(history: &History) -> Thresholds {
    let qualifying: Vec<&DetectionRecord> = history.qualifying().collect();
    let peaks: Vec<&DetectionRecord> = qualifying
        .iter()
        .copied()
        .filter(|r| r.kind == DetectionKind::Peak)
        .collect();
    let troughs: Vec<&DetectionRecord> = qualifying
        .iter()
        .copied()
        .filter(|r| r.kind == DetectionKind::Trough)
        .collect();

    let size = peaks.len().min(troughs.len());
    if size == 0 {
        return Thresholds::default();
    }

    let pairs: Vec<(&DetectionRecord, &DetectionRecord)> = peaks[peaks.len() - size..]
        .iter()
        .copied()
        .zip(troughs[troughs.len() - size..].iter().copied())
        .collect();

    let time: Vec<f64> = pairs
        .iter()
        .map(|(p, t)| (p.timestamp - t.timestamp) as f64)
        .collect();
    let amplitude: Vec<f64> = pairs.iter().map(|(p, t)| p.amplitude - t.amplitude).collect();

    Thresholds {
        time: estimate_axis(&time, qualifying.len()),
        amplitude: estimate_axis(&amplitude, qualifying.len()),
    }
}

fn estimate_axis(differences: &[f64], qualifying: usize) -> Estimate {
    let kept = reject_outliers(differences);
    if kept.is_empty() {
        return Estimate::default();
    }

    let weights = linear_weights(kept.len());
    let weight_sum: f64 = weights.iter().sum();
    let mean = kept.iter().zip(&weights).map(|(d, w)| d * w).sum::<f64>() / weight_sum;

    let dispersion = if qualifying >= MIN_RECORDS_FOR_VARIANCE && kept.len() > 1 {
        let n = kept.len() as f64;
        let variance = kept
            .iter()
            .zip(&weights)
            .map(|(d, w)| w * (d - mean).powi(2))
            .sum::<f64>()
            / weight_sum;
        (variance * n / (n - 1.0)).sqrt() * DISPERSION_MULTIPLIER
    } else {
        mean.abs() / 2.0
    };

    Estimate {
        mean: mean.abs(),
        dispersion,
    }
}

fn reject_outliers(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let cutoff = std_dev * OUTLIER_CUTOFF_STD;

    values
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() <= cutoff)
        .collect()
}

/// Weights rising linearly from oldest to newest
fn linear_weights(count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![OLDEST_WEIGHT],
        _ => {
            let step = (NEWEST_WEIGHT - OLDEST_WEIGHT) / (count - 1) as f64;
            (0..count).map(|i| OLDEST_WEIGHT + step * i as f64).collect()
        }
    }
}
