use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crossbeam_channel::Receiver;

use super::Inbound;
use crate::detection::Sample;
use crate::error::{PeakError, Result};

/// Where the detection loop takes its input from
pub trait SampleSource: Send {
    /// Block until the next message arrives
    ///
    /// Returns `PeakError::ChannelClosed` once the stream ends without a
    /// cancellation sentinel.
    fn recv(&mut self) -> Result<Inbound>;
}

/// Source fed by another thread through a bounded channel
pub struct ChannelSource {
    rx: Receiver<Inbound>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Inbound>) -> Self {
        Self { rx }
    }
}

impl SampleSource for ChannelSource {
    fn recv(&mut self) -> Result<Inbound> {
        self.rx.recv().map_err(|_| PeakError::ChannelClosed)
    }
}

/// Source replaying a finished recording
///
/// Yields the queued messages in order. A replay can end with a
/// cancellation sentinel (`with_cancel`) or simply run dry, which looks like
/// an unexpected channel closure to the loop.
pub struct ReplaySource {
    messages: std::vec::IntoIter<Inbound>,
}

impl ReplaySource {
    pub fn new(messages: Vec<Inbound>) -> Self {
        Self {
            messages: messages.into_iter(),
        }
    }

    /// Replay `samples` followed by a cancellation sentinel
    pub fn with_cancel(samples: &[Sample]) -> Self {
        let mut messages: Vec<Inbound> = samples.iter().copied().map(Inbound::Sample).collect();
        messages.push(Inbound::Cancel);
        Self::new(messages)
    }
}

impl SampleSource for ReplaySource {
    fn recv(&mut self) -> Result<Inbound> {
        self.messages.next().ok_or(PeakError::ChannelClosed)
    }
}

/// Read one channel of a CSV recording
///
/// The first column is the timestamp in milliseconds, followed by one column
/// per recorded channel; `channel` selects among those (zero-based). A header
/// line is skipped when its first field is not numeric, as are blank lines.
pub fn read_csv_recording<P: AsRef<Path>>(path: P, channel: usize) -> Result<Vec<Sample>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    parse_csv_recording(reader, channel)
}

pub fn parse_csv_recording<R: BufRead>(reader: R, channel: usize) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let Ok(time) = fields[0].parse::<f64>() else {
            if number == 0 {
                continue;
            }
            return Err(PeakError::Parse {
                line: number + 1,
                message: format!("invalid timestamp {:?}", fields[0]),
            });
        };

        let field = fields.get(channel + 1).ok_or_else(|| PeakError::Parse {
            line: number + 1,
            message: format!("no column for channel {}", channel),
        })?;
        // non-finite values are kept; the detector reports them as malformed
        let amplitude = field.parse::<f64>().unwrap_or(f64::NAN);

        samples.push(Sample::new(time.round() as i64, amplitude));
    }

    Ok(samples)
}

/// Write a single-channel recording in the layout [`parse_csv_recording`] reads
pub fn write_csv_recording<W: Write>(mut out: W, samples: &[Sample]) -> Result<()> {
    writeln!(out, "time,ch0")?;
    for sample in samples {
        writeln!(out, "{},{}", sample.timestamp, sample.amplitude)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_ends_with_cancel() {
        let mut source = ReplaySource::with_cancel(&[Sample::new(0, 1.0)]);
        assert_eq!(source.recv().unwrap(), Inbound::Sample(Sample::new(0, 1.0)));
        assert_eq!(source.recv().unwrap(), Inbound::Cancel);
        assert!(matches!(source.recv(), Err(PeakError::ChannelClosed)));
    }

    #[test]
    fn test_channel_source_reports_closure() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut source = ChannelSource::new(rx);
        tx.send(Inbound::Cancel).unwrap();
        drop(tx);
        assert_eq!(source.recv().unwrap(), Inbound::Cancel);
        assert!(matches!(source.recv(), Err(PeakError::ChannelClosed)));
    }

    #[test]
    fn test_parse_csv_with_header() {
        let csv = "time,ch1,ch2\n0,0.5,1.5\n5,0.6,1.4\n\n10.2,0.7,1.3\n";
        let samples = parse_csv_recording(csv.as_bytes(), 1).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2], Sample::new(10, 1.3));
    }

    #[test]
    fn test_parse_csv_missing_channel() {
        let csv = "0,0.5\n";
        let err = parse_csv_recording(csv.as_bytes(), 3).unwrap_err();
        assert!(matches!(err, PeakError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_written_recording_reads_back() {
        let samples = vec![Sample::new(0, 0.25), Sample::new(20, -1.5)];
        let mut buf = Vec::new();
        write_csv_recording(&mut buf, &samples).unwrap();
        assert_eq!(parse_csv_recording(buf.as_slice(), 0).unwrap(), samples);
    }

    #[test]
    fn test_parse_csv_keeps_bad_amplitude_as_nan() {
        let csv = "0,abc\n";
        let samples = parse_csv_recording(csv.as_bytes(), 0).unwrap();
        assert!(samples[0].amplitude.is_nan());
    }
}
