pub mod message;
pub mod sink;
pub mod source;

pub use message::{Command, DetectionEvent, HealthReport, Inbound, Outbound};
pub use sink::{ChannelSink, EventSink};
pub use source::{
    ChannelSource, ReplaySource, SampleSource, parse_csv_recording, read_csv_recording,
    write_csv_recording,
};
