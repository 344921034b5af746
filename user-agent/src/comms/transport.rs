//! Where responses go.

use crossbeam::channel::{self, Receiver, Sender};
use shared::events::EventInformation;

use crate::fs::Instance;

/// Destination for completed requests.
///
/// Sending cannot fail from the caller's point of view; an implementation
/// logs its own I/O problems.
pub trait EventSink: Send + Sync {
    fn send_event_information(&self, info: &EventInformation, instance: Option<&Instance>);
}

/// In-process transport over a `crossbeam` channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: Sender<EventInformation>,
}

impl ChannelTransport {
    pub fn new(tx: Sender<EventInformation>) -> Self {
        Self { tx }
    }

    /// Unbounded transport plus the receiving end.
    pub fn pair() -> (Self, Receiver<EventInformation>) {
        let (tx, rx) = channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelTransport {
    fn send_event_information(&self, info: &EventInformation, instance: Option<&Instance>) {
        log::trace!(
            "response {} -> {}",
            info.serial_number,
            instance.map_or("<no instance>", |i| i.options().mount_point.as_str())
        );
        if self.tx.send(info.clone()).is_err() {
            log::warn!("response {} dropped: receiver gone", info.serial_number);
        }
    }
}
