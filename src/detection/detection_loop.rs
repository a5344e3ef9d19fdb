use serde::Serialize;

use crate::config::{BaselineConfig, DetectionConfig, SignalMode};
use crate::constants::REALTIME_TAIL;
use crate::detection::baseline::{BatchPeakFinder, DerivativePeakFinder, seed};
use crate::detection::classifier::classify;
use crate::detection::thresholds::{Thresholds, estimate_thresholds};
use crate::detection::types::{DetectionKind, DetectionRecord, Extremum, History, Sample, Window};
use crate::error::Result;
use crate::io::{Command, DetectionEvent, EventSink, HealthReport, Inbound, Outbound, SampleSource};

/// What a single sample did to the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Arrived before the next decimation slot
    Decimated,
    /// Non-finite amplitude or timestamp running backwards
    Malformed { consecutive: usize },
    /// Appended; nothing confirmed yet
    Pending,
    /// A peak or trough was confirmed
    Detected(DetectionEvent),
    /// Detection starved; a forced event was emitted and history was reset
    Forced(DetectionEvent),
}

/// The adaptive peak/trough state machine
///
/// Owns the window, the history and the thresholds. Feed it samples in
/// timestamp order with [`Detector::push`]; it never blocks.
pub struct Detector {
    window: Window,
    history: History,
    thresholds: Thresholds,
    seed: Option<History>,
    interval_ms: f64,
    initial_timeout_ms: f64,
    signal_mode: SignalMode,
    malformed_run: usize,
}

impl Detector {
    /// Start a session at `first`
    ///
    /// `seed` is a baseline history; its timestamps are shifted so that its
    /// newest record coincides with `first`. Without a seed the history starts
    /// from placeholders.
    pub fn new(config: &DetectionConfig, first: Sample, seed: Option<History>) -> Self {
        let seed = seed.map(|s| s.rebased(first.timestamp));
        let history = seed
            .clone()
            .unwrap_or_else(|| History::placeholder_at(first.timestamp));
        let thresholds = estimate_thresholds(&history);

        Self {
            window: Window::new(first),
            history,
            thresholds,
            seed,
            interval_ms: config.rate.interval_ms(),
            initial_timeout_ms: config.initial_timeout_ms as f64,
            signal_mode: config.signal_mode,
            malformed_run: 0,
        }
    }

    pub fn push(&mut self, sample: Sample) -> Step {
        let previous = *self.window.last();
        if !sample.amplitude.is_finite() || sample.timestamp < previous.timestamp {
            self.malformed_run += 1;
            return Step::Malformed {
                consecutive: self.malformed_run,
            };
        }
        self.malformed_run = 0;

        if (sample.timestamp as f64) < previous.timestamp as f64 + self.interval_ms {
            return Step::Decimated;
        }

        self.window.push(sample);

        let classification = classify(
            &self.window,
            &self.history,
            &self.thresholds,
            self.interval_ms,
        );

        if let Some((extremum, index)) = classification.detected() {
            let hit = self.window.samples()[index];
            let delayed = index + REALTIME_TAIL < self.window.len();
            let record = DetectionRecord::new(extremum.into(), hit.timestamp, hit.amplitude);

            self.history.push(record);
            self.window.reset();
            self.thresholds = estimate_thresholds(&self.history);

            log::debug!(
                "{:?} at {} ms (amplitude {:.4}){}",
                extremum,
                hit.timestamp,
                hit.amplitude,
                if delayed { ", delayed" } else { "" }
            );
            return Step::Detected(self.event(record, delayed));
        }

        let elapsed = (sample.timestamp - self.history.last().timestamp) as f64;
        let bound = self.timeout_bound();
        if elapsed > bound {
            let stood_in_for = self.history.awaiting();
            let record = DetectionRecord::new(
                DetectionKind::Forced(stood_in_for),
                sample.timestamp,
                sample.amplitude,
            );
            log::warn!(
                "No {:?} within {:.0} ms, forcing one at {} ms",
                stood_in_for,
                bound,
                sample.timestamp
            );

            self.window.reset();
            self.reseed(stood_in_for, sample.timestamp);
            self.history.push(record);
            self.thresholds = estimate_thresholds(&self.history);
            return Step::Forced(self.event(record, false));
        }

        Step::Pending
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetDetectionRate(rate) if !rate.is_valid() => {
                log::warn!("Ignoring invalid detection rate {}", rate);
            }
            Command::SetDetectionRate(rate) => {
                log::info!("Detection rate set to {}", rate);
                self.interval_ms = rate.interval_ms();
            }
            Command::SetSignalMode(mode) => {
                log::info!("Signal mode set to {:?}", mode);
                self.signal_mode = mode;
            }
            Command::ResetHistory => {
                log::info!("History reset");
                self.reseed(self.history.awaiting(), self.window.last().timestamp);
                self.window.reset();
                self.thresholds = estimate_thresholds(&self.history);
            }
        }
    }

    /// Time since the last event after which a forced event fires
    ///
    /// Until the history settles the awaited extremum may be up to a full
    /// cycle away, so the bound covers two half-cycles. Confirming an
    /// extremum also takes a few samples past it.
    pub fn timeout_bound(&self) -> f64 {
        if !self.thresholds.is_informed() {
            return self.initial_timeout_ms;
        }
        let half_cycles = if self.history.is_settled() { 1.0 } else { 2.0 };
        self.thresholds.time_bound() * half_cycles + REALTIME_TAIL as f64 * self.interval_ms
    }

    pub fn signal_mode(&self) -> SignalMode {
        self.signal_mode
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Restart the history at `timestamp`, still awaiting `awaited`
    fn reseed(&mut self, awaited: Extremum, timestamp: i64) {
        self.history = match &self.seed {
            Some(seed) => seed.resumed(awaited, timestamp),
            None => History::placeholder_at(timestamp),
        };
    }

    fn event(&self, record: DetectionRecord, delayed: bool) -> DetectionEvent {
        DetectionEvent {
            timestamp: record.timestamp,
            amplitude: record.amplitude,
            kind: record.kind,
            delayed,
            signal: self.signal_mode == SignalMode::Live && !delayed && !record.kind.is_forced(),
        }
    }
}

/// Counters describing a finished session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub peaks: usize,
    pub troughs: usize,
    pub forced: usize,
    pub delayed: usize,
    pub decimated: usize,
    pub malformed: usize,
    pub health_reports: usize,
    pub seeded: bool,
}

/// Drives a [`Detector`] from a sample source into an event sink
///
/// Runs until the source delivers [`Inbound::Cancel`] or closes. The sink is
/// closed on every exit path.
pub struct DetectionLoop<S: SampleSource, K: EventSink> {
    source: S,
    sink: K,
    detection: DetectionConfig,
    baseline: BaselineConfig,
    finder: Option<Box<dyn BatchPeakFinder + Send>>,
    summary: SessionSummary,
}

impl<S: SampleSource, K: EventSink> DetectionLoop<S, K> {
    pub fn new(detection: &DetectionConfig, baseline: &BaselineConfig, source: S, sink: K) -> Self {
        let finder: Box<dyn BatchPeakFinder + Send> = Box::new(DerivativePeakFinder::new(
            baseline.height_threshold,
            baseline.min_distance_ms,
        ));
        Self {
            source,
            sink,
            detection: detection.clone(),
            baseline: baseline.clone(),
            finder: Some(finder),
            summary: SessionSummary::default(),
        }
    }

    /// Replace the batch peak finder used for baseline seeding
    ///
    /// `None` makes every baseline degrade to placeholder seeding.
    pub fn with_finder(mut self, finder: Option<Box<dyn BatchPeakFinder + Send>>) -> Self {
        self.finder = finder;
        self
    }

    pub fn run(mut self) -> Result<SessionSummary> {
        let result = self.run_inner();
        self.sink.close();
        match &result {
            Ok(summary) => log::info!("Detection stopped: {:?}", summary),
            Err(e) => log::error!("Detection aborted: {}", e),
        }
        result
    }

    fn run_inner(&mut self) -> Result<SessionSummary> {
        let seed = if self.baseline.enabled {
            match self.wait_for_baseline()? {
                Some(seed) => seed,
                None => return Ok(self.summary.clone()),
            }
        } else {
            None
        };
        self.summary.seeded = seed.is_some();

        let Some(first) = self.wait_for_first_sample()? else {
            return Ok(self.summary.clone());
        };
        log::info!(
            "Detection started at {} ms ({}, {})",
            first.timestamp,
            self.detection.rate,
            if self.summary.seeded { "seeded" } else { "unseeded" }
        );
        let mut detector = Detector::new(&self.detection, first, seed);

        loop {
            match self.source.recv()? {
                Inbound::Sample(sample) => {
                    let step = detector.push(sample);
                    self.handle(step, sample, detector.signal_mode())?;
                }
                Inbound::Command(command) => detector.apply(command),
                Inbound::Baseline(_) => log::warn!("Ignoring baseline received mid-session"),
                Inbound::Cancel => return Ok(self.summary.clone()),
            }
        }
    }

    /// Block until the calibration recording arrives
    ///
    /// Outer `None` means the session was cancelled while waiting.
    fn wait_for_baseline(&mut self) -> Result<Option<Option<History>>> {
        loop {
            match self.source.recv()? {
                Inbound::Baseline(calibration) => {
                    let finder = self.finder.as_deref().map(|f| f as &dyn BatchPeakFinder);
                    return Ok(Some(seed(&calibration, self.detection.rate, finder)));
                }
                Inbound::Command(command) => self.apply_early(command),
                Inbound::Sample(_) => self.summary.decimated += 1,
                Inbound::Cancel => return Ok(None),
            }
        }
    }

    fn wait_for_first_sample(&mut self) -> Result<Option<Sample>> {
        loop {
            match self.source.recv()? {
                Inbound::Sample(sample) if sample.amplitude.is_finite() => return Ok(Some(sample)),
                Inbound::Sample(_) => self.summary.malformed += 1,
                Inbound::Command(command) => self.apply_early(command),
                Inbound::Baseline(_) => log::warn!("Ignoring unrequested baseline"),
                Inbound::Cancel => return Ok(None),
            }
        }
    }

    /// Commands arriving before the detector exists only touch the config
    fn apply_early(&mut self, command: Command) {
        match command {
            Command::SetDetectionRate(rate) if !rate.is_valid() => {
                log::warn!("Ignoring invalid detection rate {}", rate);
            }
            Command::SetDetectionRate(rate) => self.detection.rate = rate,
            Command::SetSignalMode(mode) => self.detection.signal_mode = mode,
            Command::ResetHistory => {}
        }
    }

    fn handle(&mut self, step: Step, sample: Sample, mode: SignalMode) -> Result<()> {
        match step {
            Step::Decimated => self.summary.decimated += 1,
            Step::Pending => {}
            Step::Malformed { consecutive } => {
                self.summary.malformed += 1;
                let every = self.detection.malformed_report_every.max(1);
                if consecutive % every == 0 {
                    log::warn!(
                        "{} consecutive malformed samples (last at {} ms)",
                        consecutive,
                        sample.timestamp
                    );
                    self.summary.health_reports += 1;
                    self.sink
                        .send(Outbound::Health(HealthReport::MalformedSamples {
                            consecutive,
                            last_timestamp: sample.timestamp,
                        }))?;
                }
            }
            Step::Detected(event) => {
                match event.kind {
                    DetectionKind::Peak => self.summary.peaks += 1,
                    DetectionKind::Trough => self.summary.troughs += 1,
                    DetectionKind::Forced(_) => self.summary.forced += 1,
                }
                if event.delayed {
                    self.summary.delayed += 1;
                }
                if mode == SignalMode::Debug {
                    log::info!("Found {:?} at {} ms", event.kind, event.timestamp);
                }
                self.sink.send(Outbound::Detection(event))?;
            }
            Step::Forced(event) => {
                self.summary.forced += 1;
                self.sink.send(Outbound::Detection(event))?;
            }
        }
        Ok(())
    }
}
