use std::f64::consts::PI;

use crate::detection::Sample;

/// Shape of a synthetic physiological waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Pure sinusoid
    Sine,
    /// Sinusoid with a sharper inspiration and a longer expiration
    Respiration,
    /// Constant level
    Flat,
}

/// Generate `duration_ms` of samples spaced `step_ms` apart, starting at 0
///
/// # Arguments
/// * `shape` - Waveform shape
/// * `duration_ms` - Length of the recording
/// * `step_ms` - Sampling interval
/// * `period_ms` - Cycle length (ignored for `Flat`)
/// * `amplitude` - Scale of the waveform, or the level of a flat line
pub fn generate_waveform(
    shape: Waveform,
    duration_ms: i64,
    step_ms: i64,
    period_ms: f64,
    amplitude: f64,
) -> Vec<Sample> {
    let count = if step_ms > 0 { duration_ms / step_ms } else { 0 };
    (0..count)
        .map(|i| {
            let t = i * step_ms;
            let phase = 2.0 * PI * t as f64 / period_ms;
            let value = match shape {
                Waveform::Sine => phase.sin(),
                Waveform::Respiration => (phase.sin() + 0.25 * (2.0 * phase).sin()) / 1.22,
                Waveform::Flat => 1.0,
            };
            Sample::new(t, amplitude * value)
        })
        .collect()
}

pub fn sine_wave(duration_ms: i64, step_ms: i64, period_ms: f64, amplitude: f64) -> Vec<Sample> {
    generate_waveform(Waveform::Sine, duration_ms, step_ms, period_ms, amplitude)
}

pub fn respiration_wave(
    duration_ms: i64,
    step_ms: i64,
    period_ms: f64,
    amplitude: f64,
) -> Vec<Sample> {
    generate_waveform(Waveform::Respiration, duration_ms, step_ms, period_ms, amplitude)
}

pub fn flat_line(duration_ms: i64, step_ms: i64, level: f64) -> Vec<Sample> {
    generate_waveform(Waveform::Flat, duration_ms, step_ms, 1.0, level)
}

/// Drop every sample with `start_ms <= timestamp < end_ms`
pub fn with_dropout(samples: &[Sample], start_ms: i64, end_ms: i64) -> Vec<Sample> {
    samples
        .iter()
        .copied()
        .filter(|s| s.timestamp < start_ms || s.timestamp >= end_ms)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_length_and_spacing() {
        let samples = sine_wave(10_000, 10, 1000.0, 1.0);
        assert_eq!(samples.len(), 1000);
        assert_eq!(samples[1].timestamp - samples[0].timestamp, 10);
        assert!(samples.iter().all(|s| s.amplitude.abs() <= 1.0));
    }

    #[test]
    fn test_respiration_is_bounded_and_periodic() {
        let samples = respiration_wave(4_000, 10, 2000.0, 2.0);
        let max = samples.iter().map(|s| s.amplitude).fold(f64::MIN, f64::max);
        assert!(max <= 2.0 && max > 1.5);
        assert!((samples[0].amplitude - samples[200].amplitude).abs() < 1e-9);
    }

    #[test]
    fn test_dropout_removes_range() {
        let samples = flat_line(12_000, 10, 0.0);
        let gapped = with_dropout(&samples, 3_000, 9_000);
        assert_eq!(gapped.len(), 600);
        assert!(gapped.iter().all(|s| s.timestamp < 3_000 || s.timestamp >= 9_000));
    }
}
