use serde_json::Value;

use super::{Formatter, iso8601_timestamp};
use crate::io::Outbound;

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, message: &Outbound) -> Option<String> {
        let line = match serde_json::to_value(message) {
            Ok(Value::Object(mut map)) => {
                map.insert("ts".to_string(), Value::String(iso8601_timestamp()));
                Value::Object(map).to_string()
            }
            Ok(other) => other.to_string(),
            Err(e) => {
                log::error!("Failed to serialize {:?}: {}", message, e);
                return None;
            }
        };
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionKind, Extremum};
    use crate::io::{DetectionEvent, HealthReport};

    #[test]
    fn test_detection_fields() {
        let message = Outbound::Detection(DetectionEvent {
            timestamp: 9000,
            amplitude: -0.25,
            kind: DetectionKind::Forced(Extremum::Peak),
            delayed: false,
            signal: false,
        });
        let value: Value = serde_json::from_str(&JsonFormatter.format(&message).unwrap()).unwrap();

        assert_eq!(value["timestamp"], 9000);
        assert_eq!(value["kind"]["forced"], "peak");
        assert_eq!(value["delayed"], false);
        assert!(value["ts"].is_string());
    }

    #[test]
    fn test_health_is_tagged() {
        let message = Outbound::Health(HealthReport::MalformedSamples {
            consecutive: 20,
            last_timestamp: 400,
        });
        let value: Value = serde_json::from_str(&JsonFormatter.format(&message).unwrap()).unwrap();
        assert_eq!(value["type"], "malformed_samples");
        assert_eq!(value["consecutive"], 20);
    }
}
