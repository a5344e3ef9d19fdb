use std::io::Write;

use crossbeam_channel::Receiver;

use super::{Formatter, key_code};
use crate::detection::DetectionKind;
use crate::error::Result;
use crate::io::{DetectionEvent, Outbound};

/// Writes one key code per signalled peak or trough
///
/// Only events flagged `signal` are sent; forced and delayed events never
/// reach the device.
pub struct KeyCodeSignaller<W: Write> {
    device: W,
}

impl<W: Write> KeyCodeSignaller<W> {
    pub fn new(device: W) -> Self {
        Self { device }
    }

    /// Returns whether a key code was written
    pub fn signal(&mut self, event: &DetectionEvent) -> Result<bool> {
        if !event.signal {
            return Ok(false);
        }
        let Some(extremum) = event.kind.confirmed() else {
            return Ok(false);
        };
        self.device.write_all(&[key_code(extremum)])?;
        self.device.flush()?;
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.device
    }
}

/// The consumer stage: formats every message and drives the signaller
pub struct EventLogger<W: Write> {
    out: W,
    formatter: Box<dyn Formatter>,
    signaller: Option<KeyCodeSignaller<Box<dyn Write + Send>>>,
    written: usize,
}

impl<W: Write> EventLogger<W> {
    /// Create a logger and write the formatter's header line, if any
    pub fn new(mut out: W, formatter: Box<dyn Formatter>) -> Result<Self> {
        if let Some(header) = formatter.header() {
            writeln!(out, "{}", header)?;
        }
        Ok(Self {
            out,
            formatter,
            signaller: None,
            written: 0,
        })
    }

    pub fn with_signaller(mut self, device: Box<dyn Write + Send>) -> Self {
        self.signaller = Some(KeyCodeSignaller::new(device));
        self
    }

    pub fn write(&mut self, message: &Outbound) -> Result<()> {
        if let (Some(signaller), Outbound::Detection(event)) = (self.signaller.as_mut(), message) {
            signaller.signal(event)?;
        }
        if let Some(line) = self.formatter.format(message) {
            writeln!(self.out, "{}", line)?;
            self.written += 1;
        }
        if let Outbound::Detection(DetectionEvent {
            kind: DetectionKind::Forced(_),
            ..
        }) = message
        {
            self.out.flush()?;
        }
        Ok(())
    }

    /// Consume `rx` until the detection loop closes it
    ///
    /// Returns every message received, in order.
    pub fn drain(&mut self, rx: &Receiver<Outbound>) -> Result<Vec<Outbound>> {
        let mut received = Vec::new();
        for message in rx.iter() {
            self.write(&message)?;
            received.push(message);
        }
        self.out.flush()?;
        Ok(received)
    }

    /// Number of lines written, header excluded
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
