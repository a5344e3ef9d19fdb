use serde::Serialize;

use crate::config::{DetectionRate, SignalMode};
use crate::detection::{DetectionKind, Sample};

/// Message travelling from the sampler to the detection loop
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Sample(Sample),
    /// Calibration recording used to seed the history
    Baseline(Vec<Sample>),
    Command(Command),
    /// Orderly shutdown
    Cancel,
}

/// Live reconfiguration, applied between two samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetDetectionRate(DetectionRate),
    SetSignalMode(SignalMode),
    /// Drop learned history and start over from the seed
    ResetHistory,
}

/// A peak, trough or forced event as seen by the consumer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionEvent {
    pub timestamp: i64,
    pub amplitude: f64,
    pub kind: DetectionKind,
    /// Confirmed too far behind the newest sample to count as real-time
    pub delayed: bool,
    /// Whether the consumer should drive the external signalling device
    pub signal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HealthReport {
    /// Run of non-finite or out-of-order samples
    MalformedSamples { consecutive: usize, last_timestamp: i64 },
}

/// Message travelling from the detection loop to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Detection(DetectionEvent),
    Health(HealthReport),
}

impl Outbound {
    pub fn detection(&self) -> Option<&DetectionEvent> {
        match self {
            Self::Detection(event) => Some(event),
            Self::Health(_) => None,
        }
    }
}
