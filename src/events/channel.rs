//! Event channel between the curation engine and its front ends.
//!
//! Senders are spread over the scanner thread, the matcher and the
//! resolver; the front end holds the single receiver. The channel is
//! unbounded so a slow terminal never stalls a fingerprint batch.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Cloneable producer side, handed to every engine component
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event; discarded if the front end has gone away
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Front-end side of the channel
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Next event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Everything queued right now, without waiting for more.
    ///
    /// The interactive loop calls this between key presses.
    pub fn drain(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.try_iter()
    }

    /// Blocking iterator that ends once every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for engine event channels
pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender for components nobody is listening to
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
