use approx::assert_relative_eq;

use rtpeaks::config::DetectorConfig;
use rtpeaks::detection::{
    DetectionKind, Detector, Extremum, Sample, Step, estimate_thresholds, find_extrema,
};
use rtpeaks::io::{DetectionEvent, Outbound};
use rtpeaks::pipeline::detect_offline;
use rtpeaks::simulation::{NoiseConfig, apply_noise, flat_line, sine_wave, with_dropout};

fn detections(events: &[Outbound]) -> Vec<DetectionEvent> {
    events.iter().filter_map(Outbound::detection).copied().collect()
}

fn assert_alternates(events: &[DetectionEvent]) {
    let confirmed: Vec<&DetectionEvent> = events.iter().filter(|e| !e.kind.is_forced()).collect();
    for pair in confirmed.windows(2) {
        assert_ne!(
            pair[0].kind, pair[1].kind,
            "consecutive {:?} at {} and {} ms",
            pair[0].kind, pair[0].timestamp, pair[1].timestamp
        );
    }
}

fn assert_monotonic(events: &[DetectionEvent]) {
    for pair in events.windows(2) {
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "event at {} ms after event at {} ms",
            pair[1].timestamp,
            pair[0].timestamp
        );
    }
}

#[test]
fn test_clean_sine_detects_every_cycle() {
    // 1 Hz sine sampled at 100 Hz, detection at 50 Hz
    let samples = sine_wave(10_000, 10, 1000.0, 1.0);
    let (events, summary) = detect_offline(&samples, None, &DetectorConfig::default()).unwrap();
    let events = detections(&events);

    assert_eq!(summary.peaks, 10);
    assert_eq!(summary.troughs, 10);
    assert_eq!(summary.forced, 0);
    assert_alternates(&events);
    assert_monotonic(&events);

    for (cycle, pair) in events.chunks(2).enumerate() {
        let start = cycle as i64 * 1000;
        assert_eq!(pair[0].kind, DetectionKind::Peak);
        assert!((pair[0].timestamp - (start + 250)).abs() <= 10);
        assert_relative_eq!(pair[0].amplitude, 1.0, epsilon = 0.01);

        assert_eq!(pair[1].kind, DetectionKind::Trough);
        assert!((pair[1].timestamp - (start + 750)).abs() <= 10);
        assert_relative_eq!(pair[1].amplitude, -1.0, epsilon = 0.01);
    }
    assert!(events.iter().all(|e| e.delayed != e.signal));
}

#[test]
fn test_dropout_forces_one_event_then_recovers() {
    let samples = with_dropout(&sine_wave(12_000, 10, 1000.0, 1.0), 3_000, 9_000);
    let (events, summary) = detect_offline(&samples, None, &DetectorConfig::default()).unwrap();
    let events = detections(&events);

    assert_eq!(summary.forced, 1);
    let forced: Vec<&DetectionEvent> = events.iter().filter(|e| e.kind.is_forced()).collect();
    assert_eq!(forced[0].timestamp, 9_000);
    assert_eq!(forced[0].kind, DetectionKind::Forced(Extremum::Peak));
    assert!(!forced[0].signal);

    let after: Vec<&DetectionEvent> = events.iter().filter(|e| e.timestamp > 9_000).collect();
    assert!(after.len() >= 5);
    assert_eq!(after[0].kind, DetectionKind::Peak);
    assert!((after[0].timestamp - 9_250).abs() <= 10);
    assert_eq!(after[1].kind, DetectionKind::Trough);
    assert!((after[1].timestamp - 9_750).abs() <= 10);

    assert_alternates(&events);
    assert_monotonic(&events);
}

#[test]
fn test_seeded_dropout_forces_one_event_then_recovers() {
    let calibration = sine_wave(20_000, 10, 1000.0, 1.0);
    let samples = with_dropout(&sine_wave(20_000, 10, 1000.0, 1.0), 3_000, 9_000);
    let (events, summary) =
        detect_offline(&samples, Some(&calibration), &DetectorConfig::default()).unwrap();
    let events = detections(&events);

    assert!(summary.seeded);
    assert_eq!(summary.forced, 1, "{:?}", summary);
    let forced: Vec<&DetectionEvent> = events.iter().filter(|e| e.kind.is_forced()).collect();
    assert_eq!(forced[0].timestamp, 9_000);
    assert_eq!(forced[0].kind, DetectionKind::Forced(Extremum::Peak));

    // alternation resumes within one period of the gap
    let after: Vec<&DetectionEvent> = events.iter().filter(|e| e.timestamp > 9_000).collect();
    assert!(after.len() >= 20);
    assert_eq!(after[0].kind, DetectionKind::Peak);
    assert!((after[0].timestamp - 9_250).abs() <= 10);
    assert_eq!(after[1].kind, DetectionKind::Trough);
    assert!((after[1].timestamp - 9_750).abs() <= 10);

    assert_alternates(&events);
    assert_monotonic(&events);
}

#[test]
fn test_flat_line_forces_once_per_timeout() {
    let samples = flat_line(5_000, 10, 0.4);
    let (events, summary) = detect_offline(&samples, None, &DetectorConfig::default()).unwrap();
    let events = detections(&events);

    assert_eq!(summary.peaks + summary.troughs, 0);
    assert_eq!(summary.forced, 2);
    let stamps: Vec<i64> = events.iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps, vec![2_020, 4_040]);
    // nothing confirmed, so both stand in for the same awaited peak
    assert!(
        events
            .iter()
            .all(|e| e.kind == DetectionKind::Forced(Extremum::Peak))
    );
}

#[test]
fn test_triangle_extrema() {
    let signal = [0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0];
    assert_eq!(find_extrema(&signal, Extremum::Peak), vec![2]);
    assert_eq!(find_extrema(&signal, Extremum::Trough), vec![6]);
}

#[test]
fn test_replay_is_deterministic() {
    let clean = sine_wave(8_000, 10, 1000.0, 1.0);
    let noisy = apply_noise(&clean, &NoiseConfig::default().with_seed(3).with_gaussian(0.03));
    let config = DetectorConfig::default();

    let first = detect_offline(&noisy, None, &config).unwrap();
    let second = detect_offline(&noisy, None, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_noisy_signal_keeps_alternating() {
    let calibration = apply_noise(
        &sine_wave(6_000, 10, 2000.0, 1.0),
        &NoiseConfig::default().with_seed(11).with_gaussian(0.05),
    );
    let live = apply_noise(
        &sine_wave(60_000, 10, 2000.0, 1.0),
        &NoiseConfig::default()
            .with_seed(12)
            .with_gaussian(0.05)
            .with_impulse(0.2, 0.5),
    );

    let (events, summary) =
        detect_offline(&live, Some(&calibration), &DetectorConfig::default()).unwrap();
    let events = detections(&events);

    assert_alternates(&events);
    assert_monotonic(&events);
    assert!(summary.peaks + summary.troughs >= 20, "{:?}", summary);
}

#[test]
fn test_baseline_seeds_detection() {
    // calibration ends on a trough; live recording starts on one
    let calibration = sine_wave(5_000, 10, 1000.0, 1.0);
    let live: Vec<Sample> = (0..400)
        .map(|i| {
            let t = i * 10;
            Sample::new(t, -(2.0 * std::f64::consts::PI * t as f64 / 1000.0).cos())
        })
        .collect();

    let (events, summary) =
        detect_offline(&live, Some(&calibration), &DetectorConfig::default()).unwrap();
    let events = detections(&events);

    assert!(summary.seeded);
    assert_eq!(summary.forced, 0);
    assert_eq!(events[0].kind, DetectionKind::Peak);
    assert!((events[0].timestamp - 500).abs() <= 10);
    assert_eq!(summary.peaks, 4);
    assert_eq!(summary.troughs, 3);
    assert_alternates(&events);
}

#[test]
fn test_flat_baseline_degrades_to_placeholders() {
    let calibration = flat_line(5_000, 10, 0.0);
    let samples = sine_wave(3_000, 10, 1000.0, 1.0);

    let (events, summary) =
        detect_offline(&samples, Some(&calibration), &DetectorConfig::default()).unwrap();

    assert!(!summary.seeded);
    assert_eq!(summary.peaks, 3);
    assert_eq!(detections(&events)[0].kind, DetectionKind::Peak);
}

#[test]
fn test_forced_reset_bounds_history() {
    let config = DetectorConfig::default();
    let calibration = sine_wave(5_000, 10, 1000.0, 1.0);
    let seed = rtpeaks::detection::seed(
        &calibration,
        config.detection.rate,
        Some(&rtpeaks::detection::DerivativePeakFinder::new(0.2, 200)),
    )
    .unwrap();
    let seed_len = seed.len();

    let mut detector = Detector::new(&config.detection, Sample::new(0, -1.0), Some(seed));
    let informed = *detector.thresholds();
    let mut forced = 0;
    for t in (20..3_000).step_by(20) {
        if let Step::Forced(event) = detector.push(Sample::new(t, -1.0)) {
            forced += 1;
            assert_eq!(event.kind, DetectionKind::Forced(Extremum::Peak));
            assert!(detector.history().len() <= seed_len + 1);
        }
    }

    assert!(forced >= 1);
    // a reset restores the seed, so the thresholds are the seeded ones again
    assert_eq!(*detector.thresholds(), informed);
    assert_eq!(
        estimate_thresholds(detector.history()),
        *detector.thresholds()
    );
}

#[test]
fn test_thresholds_stay_non_negative() {
    let clean = sine_wave(30_000, 10, 1500.0, 2.0);
    for seed in 0..5 {
        let noisy = apply_noise(
            &clean,
            &NoiseConfig::default()
                .with_seed(seed)
                .with_gaussian(0.1)
                .with_wander(0.5, 12_000.0),
        );
        let config = DetectorConfig::default();
        let mut detector = Detector::new(&config.detection, noisy[0], None);
        for &sample in &noisy[1..] {
            detector.push(sample);
            let t = detector.thresholds();
            assert!(t.time.mean >= 0.0 && t.time.dispersion >= 0.0);
            assert!(t.amplitude.mean >= 0.0 && t.amplitude.dispersion >= 0.0);
        }
    }
}
