//! Three-stage wiring: sampler, detection loop and consumer joined by bounded
//! channels.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::config::DetectorConfig;
use crate::detection::{DetectionLoop, Sample, SessionSummary};
use crate::error::{PeakError, Result};
use crate::io::{ChannelSink, ChannelSource, Inbound, Outbound, ReplaySource};

/// A detection loop running on its own thread
///
/// The caller owns the consumer end (`events`) and either feeds the input
/// itself with [`Pipeline::send`] or hands it to a sampler thread with
/// [`Pipeline::replay`].
pub struct Pipeline {
    input: Option<Sender<Inbound>>,
    output: Receiver<Outbound>,
    detector: JoinHandle<Result<SessionSummary>>,
}

impl Pipeline {
    pub fn spawn(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;

        let (input, input_rx) = bounded(config.pipeline.input_capacity);
        let (output_tx, output) = bounded(config.pipeline.output_capacity);

        let detection = config.detection.clone();
        let baseline = config.baseline.clone();
        let detector = thread::Builder::new()
            .name("rtpeaks-detector".into())
            .spawn(move || {
                DetectionLoop::new(
                    &detection,
                    &baseline,
                    ChannelSource::new(input_rx),
                    ChannelSink::new(output_tx),
                )
                .run()
            })?;

        Ok(Self {
            input: Some(input),
            output,
            detector,
        })
    }

    /// Send one message to the detection loop, blocking while its queue is full
    pub fn send(&self, message: Inbound) -> Result<()> {
        let input = self.input.as_ref().ok_or(PeakError::ChannelClosed)?;
        input.send(message).map_err(|_| PeakError::ChannelClosed)
    }

    /// Hand the input over to a sampler thread replaying `messages`
    ///
    /// The sampler drops the input when it is done; without a trailing
    /// [`Inbound::Cancel`] the loop then ends with `ChannelClosed`. The
    /// sampler's result is the number of messages delivered.
    pub fn replay(&mut self, messages: Vec<Inbound>) -> Result<JoinHandle<Result<usize>>> {
        let input = self.input.take().ok_or(PeakError::ChannelClosed)?;
        let sampler = thread::Builder::new()
            .name("rtpeaks-sampler".into())
            .spawn(move || {
                let mut sent = 0;
                for message in messages {
                    input.send(message).map_err(|_| PeakError::ChannelClosed)?;
                    sent += 1;
                }
                log::debug!("Sampler finished after {} messages", sent);
                Ok(sent)
            })?;
        Ok(sampler)
    }

    /// Consumer end; disconnects once the detection loop has stopped
    pub fn events(&self) -> &Receiver<Outbound> {
        &self.output
    }

    /// Wait for the detection loop to finish
    ///
    /// Drain [`Pipeline::events`] first: a full output queue blocks the loop.
    pub fn join(self) -> Result<SessionSummary> {
        let Self {
            input,
            output,
            detector,
        } = self;
        drop(input);
        let summary = detector
            .join()
            .map_err(|_| PeakError::WorkerPanicked("detector"))?;
        drop(output);
        summary
    }
}

/// Messages replaying a recording: the optional baseline, every sample, then
/// the cancellation sentinel
pub fn recording_messages(baseline: Option<&[Sample]>, samples: &[Sample]) -> Vec<Inbound> {
    let mut messages = Vec::with_capacity(samples.len() + 2);
    if let Some(calibration) = baseline {
        messages.push(Inbound::Baseline(calibration.to_vec()));
    }
    messages.extend(samples.iter().copied().map(Inbound::Sample));
    messages.push(Inbound::Cancel);
    messages
}

/// Run the detection loop over a finished recording on the calling thread
///
/// Baseline seeding is enabled exactly when `baseline` is given.
pub fn detect_offline(
    samples: &[Sample],
    baseline: Option<&[Sample]>,
    config: &DetectorConfig,
) -> Result<(Vec<Outbound>, SessionSummary)> {
    config.validate()?;

    let mut baseline_config = config.baseline.clone();
    baseline_config.enabled = baseline.is_some();

    let source = ReplaySource::new(recording_messages(baseline, samples));
    let mut events: Vec<Outbound> = Vec::new();
    let summary =
        DetectionLoop::new(&config.detection, &baseline_config, source, &mut events).run()?;
    Ok((events, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(duration_ms: i64, step_ms: i64) -> Vec<Sample> {
        (0..duration_ms / step_ms)
            .map(|i| {
                let t = i * step_ms;
                Sample::new(t, (2.0 * std::f64::consts::PI * t as f64 / 1000.0).sin())
            })
            .collect()
    }

    #[test]
    fn test_threaded_replay_matches_offline() {
        let samples = sine(3000, 10);
        let config = DetectorConfig::default();

        let mut pipeline = Pipeline::spawn(&config).unwrap();
        let sampler = pipeline
            .replay(recording_messages(None, &samples))
            .unwrap();
        let threaded: Vec<Outbound> = pipeline.events().iter().collect();
        assert_eq!(sampler.join().unwrap().unwrap(), samples.len() + 1);
        let summary = pipeline.join().unwrap();

        let (offline, offline_summary) = detect_offline(&samples, None, &config).unwrap();
        assert_eq!(threaded, offline);
        assert_eq!(summary, offline_summary);
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let mut pipeline = Pipeline::spawn(&DetectorConfig::default()).unwrap();
        let sampler = pipeline
            .replay(vec![Inbound::Sample(Sample::new(0, 0.0))])
            .unwrap();
        assert!(pipeline.events().iter().next().is_none());
        sampler.join().unwrap().unwrap();
        assert!(matches!(pipeline.join(), Err(PeakError::ChannelClosed)));
    }

    #[test]
    fn test_cancel_through_send() {
        let pipeline = Pipeline::spawn(&DetectorConfig::default()).unwrap();
        pipeline.send(Inbound::Sample(Sample::new(0, 0.0))).unwrap();
        pipeline.send(Inbound::Cancel).unwrap();
        assert!(pipeline.events().iter().next().is_none());
        assert_eq!(pipeline.join().unwrap(), SessionSummary::default());
    }
}
