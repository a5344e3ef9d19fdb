use super::{Formatter, event_code};
use crate::io::Outbound;

/// Event log in the `time,amplitude,peak` layout
///
/// Health reports have no row in this format.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, message: &Outbound) -> Option<String> {
        let event = message.detection()?;
        Some(format!(
            "{},{:.6},{}",
            event.timestamp,
            event.amplitude,
            event_code(event.kind)
        ))
    }

    fn header(&self) -> Option<&'static str> {
        Some("time,amplitude,peak")
    }
}
