use crossbeam_channel::Sender;

use super::Outbound;
use crate::error::{PeakError, Result};

/// Where the detection loop delivers its events
pub trait EventSink: Send {
    /// Deliver one message, blocking while the consumer is behind
    fn send(&mut self, message: Outbound) -> Result<()>;

    /// Flush and release the consumer; called once when the loop exits
    fn close(&mut self) {}
}

/// Sink backed by a bounded channel
///
/// A full channel blocks the sender instead of dropping events.
pub struct ChannelSink {
    tx: Option<Sender<Outbound>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Outbound>) -> Self {
        Self { tx: Some(tx) }
    }
}

impl EventSink for ChannelSink {
    fn send(&mut self, message: Outbound) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(PeakError::OutputClosed(1))?;
        tx.send(message).map_err(|_| PeakError::OutputClosed(1))
    }

    fn close(&mut self) {
        // dropping the sender lets the consumer drain and see the disconnect
        self.tx.take();
    }
}

impl EventSink for Vec<Outbound> {
    fn send(&mut self, message: Outbound) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn send(&mut self, message: Outbound) -> Result<()> {
        (**self).send(message)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
