mod csv;
mod json;
mod logger;
mod text;

use chrono::Utc;

use crate::detection::{DetectionKind, Extremum};
use crate::io::Outbound;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::logger::{EventLogger, KeyCodeSignaller};
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

pub trait Formatter: Send {
    /// Render one message, or `None` when this format has no line for it
    fn format(&self, message: &Outbound) -> Option<String>;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Event-log code: 1 = peak, 0 = trough, 2 = forced
pub fn event_code(kind: DetectionKind) -> u8 {
    match kind {
        DetectionKind::Peak => 1,
        DetectionKind::Trough => 0,
        DetectionKind::Forced(_) => 2,
    }
}

/// Key code sent to the signalling device for a confirmed extremum
pub fn key_code(extremum: Extremum) -> u8 {
    match extremum {
        Extremum::Peak => b'p',
        Extremum::Trough => b't',
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
