use super::{Formatter, iso8601_timestamp};
use crate::detection::DetectionKind;
use crate::io::{HealthReport, Outbound};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, message: &Outbound) -> Option<String> {
        let line = match message {
            Outbound::Detection(event) => {
                let kind = match event.kind {
                    DetectionKind::Peak => "Peak".to_string(),
                    DetectionKind::Trough => "Trough".to_string(),
                    DetectionKind::Forced(e) => format!("Forced ({:?})", e),
                };
                if self.verbose {
                    format!(
                        "{} {:<15} at {:>8} ms  amplitude: {:>9.4} [delayed: {}, signal: {}]",
                        iso8601_timestamp(),
                        kind,
                        event.timestamp,
                        event.amplitude,
                        event.delayed,
                        event.signal
                    )
                } else {
                    format!(
                        "{:<15} at {:>8} ms  amplitude: {:>9.4}",
                        kind, event.timestamp, event.amplitude
                    )
                }
            }
            Outbound::Health(HealthReport::MalformedSamples {
                consecutive,
                last_timestamp,
            }) => format!(
                "Health: {} consecutive malformed samples (last at {} ms)",
                consecutive, last_timestamp
            ),
        };
        Some(line)
    }
}
