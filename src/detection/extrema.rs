use crate::constants::NORMALIZE_EPSILON;
use crate::detection::types::Extremum;
use crate::error::{PeakError, Result};

/// Find local extrema from sign changes of the first difference
///
/// Returns ascending indices of every peak (or trough) in `signal`. Flat runs
/// take the trend of whatever follows them, so a plateau at the top of a rise
/// reports its first sample.
///
/// # Example
/// ```
/// use rtpeaks::detection::{Extremum, find_extrema};
///
/// let signal = [0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0];
/// assert_eq!(find_extrema(&signal, Extremum::Peak), vec![2]);
/// assert_eq!(find_extrema(&signal, Extremum::Trough), vec![6]);
/// ```
pub fn find_extrema(signal: &[f64], wanted: Extremum) -> Vec<usize> {
    turning_points(signal, wanted)
}

/// Like [`find_extrema`], restricted by a normalized height threshold
///
/// Peaks must exceed `threshold * max` and troughs must lie below
/// `threshold * min` of the normalized signal. A threshold of zero applies no
/// restriction.
///
/// # Arguments
/// * `signal` - Samples to search
/// * `wanted` - Peaks or troughs
/// * `threshold` - Normalized height threshold in `[0, 1]`
pub fn find_extrema_above(signal: &[f64], wanted: Extremum, threshold: f64) -> Result<Vec<usize>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PeakError::InvalidThreshold(threshold));
    }

    let indices = turning_points(signal, wanted);
    if threshold == 0.0 || indices.is_empty() {
        return Ok(indices);
    }

    let normalized = normalize(signal);
    let filtered = match wanted {
        Extremum::Peak => {
            let limit = threshold * normalized.iter().cloned().fold(f64::MIN, f64::max);
            indices.into_iter().filter(|&i| normalized[i] > limit).collect()
        }
        Extremum::Trough => {
            let limit = threshold * normalized.iter().cloned().fold(f64::MAX, f64::min);
            indices.into_iter().filter(|&i| normalized[i] < limit).collect()
        }
    };
    Ok(filtered)
}

/// Subtract the mean and divide by the (population) standard deviation
///
/// A constant signal comes back mean-subtracted only.
pub fn normalize(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    let variance = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if signal.len() == 1 || std_dev < NORMALIZE_EPSILON {
        signal.iter().map(|x| x - mean).collect()
    } else {
        signal.iter().map(|x| (x - mean) / std_dev).collect()
    }
}

fn turning_points(signal: &[f64], wanted: Extremum) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }

    let normalized = normalize(signal);
    let mut trend: Vec<i8> = normalized
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if d > 0.0 {
                1
            } else if d < 0.0 {
                -1
            } else {
                0
            }
        })
        .collect();

    // Flat steps inherit the next non-flat trend; trailing flats ascend
    let mut next = 1;
    for t in trend.iter_mut().rev() {
        if *t == 0 {
            *t = next;
        }
        next = *t;
    }

    let (before, after) = match wanted {
        Extremum::Peak => (1, -1),
        Extremum::Trough => (-1, 1),
    };

    trend
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] == before && w[1] == after)
        .map(|(i, _)| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAMP: [f64; 9] = [0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0];

    #[test]
    fn test_single_peak_and_trough() {
        assert_eq!(find_extrema(&RAMP, Extremum::Peak), vec![2]);
        assert_eq!(find_extrema(&RAMP, Extremum::Trough), vec![6]);
    }

    #[test]
    fn test_short_signals_have_no_extrema() {
        assert!(find_extrema(&[], Extremum::Peak).is_empty());
        assert!(find_extrema(&[1.0, 0.0], Extremum::Peak).is_empty());
    }

    #[test]
    fn test_constant_signal_has_no_extrema() {
        let flat = [3.0; 20];
        assert!(find_extrema(&flat, Extremum::Peak).is_empty());
        assert!(find_extrema(&flat, Extremum::Trough).is_empty());
    }

    #[test]
    fn test_plateau_reports_first_sample() {
        let signal = [0.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0];
        assert_eq!(find_extrema(&signal, Extremum::Peak), vec![2]);
    }

    #[test]
    fn test_trailing_plateau_is_not_a_peak() {
        // nothing after the flat run, so it is treated as still rising
        let signal = [0.0, 1.0, 2.0, 2.0, 2.0];
        assert!(find_extrema(&signal, Extremum::Peak).is_empty());
    }

    #[test]
    fn test_multiple_extrema_ascending() {
        let signal: Vec<f64> = (0..200).map(|i| (i as f64 * 0.1).sin()).collect();
        let peaks = find_extrema(&signal, Extremum::Peak);
        assert_eq!(peaks.len(), 3);
        assert!(peaks.windows(2).all(|w| w[0] < w[1]));
        for &p in &peaks {
            assert!(signal[p] > 0.99);
        }
    }

    #[test]
    fn test_height_threshold_filters_small_peaks() {
        let signal = [0.0, 5.0, 0.0, 0.5, 0.0, 5.0, 0.0];
        let all = find_extrema(&signal, Extremum::Peak);
        assert_eq!(all, vec![1, 3, 5]);

        let tall = find_extrema_above(&signal, Extremum::Peak, 0.5).unwrap();
        assert_eq!(tall, vec![1, 5]);
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        assert!(matches!(
            find_extrema_above(&RAMP, Extremum::Peak, 1.5),
            Err(PeakError::InvalidThreshold(_))
        ));
        assert!(find_extrema_above(&RAMP, Extremum::Peak, -0.1).is_err());
    }

    #[test]
    fn test_normalize_constant_signal() {
        let normalized = normalize(&[2.0, 2.0, 2.0]);
        assert!(normalized.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_normalize_unit_variance() {
        let normalized = normalize(&RAMP);
        let mean: f64 = normalized.iter().sum::<f64>() / normalized.len() as f64;
        let var: f64 =
            normalized.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / normalized.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }
}
