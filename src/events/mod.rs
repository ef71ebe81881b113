//! Trigger events and the bounded queue between listeners and the consumer.
//!
//! Hotkey listeners produce events on their own thread; the headless loop or
//! the form consumes them one at a time. The queue is bounded: when it is
//! full the newest event is dropped and logged, so a held-down key cannot
//! pile up a backlog of stale reads.

use std::fmt;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};

use crate::pricing::Tier;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 8;

/// Something the operator asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Read the tier, undercut, copy/paste.
    ReadPaste(Tier),
    /// Read all tiers, recommend one, undercut, copy/paste.
    Optimize,
    /// Store a region centred on the pointer for the tier.
    Calibrate(Tier),
    /// Print every tier's reading and undercut.
    PrintAll,
    /// Print the pointer position.
    ShowPointer,
    /// Leave the headless loop.
    Quit,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ReadPaste(tier) => write!(f, "read lot {}", tier),
            Event::Optimize => write!(f, "optimize"),
            Event::Calibrate(tier) => write!(f, "calibrate lot {}", tier),
            Event::PrintAll => write!(f, "print all"),
            Event::ShowPointer => write!(f, "show pointer"),
            Event::Quit => write!(f, "quit"),
        }
    }
}

/// Producer side of the event queue.
#[derive(Clone)]
pub struct EventSender {
    inner: SyncSender<Event>,
}

impl EventSender {
    /// Queues `event` without blocking.
    ///
    /// Returns false when the event was dropped because the queue is full or
    /// the consumer is gone.
    pub fn post(&self, event: Event) -> bool {
        match self.inner.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(%event, "event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                tracing::debug!(%event, "event consumer gone, dropping event");
                false
            }
        }
    }
}

/// Consumer side of the event queue.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Blocks until the next event; `None` once every sender is dropped.
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Next event if one is waiting.
    pub fn try_recv(&self) -> Option<Event> {
        match self.inner.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Every event currently waiting, in arrival order.
    pub fn drain(&self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Creates a bounded event queue holding at most `capacity` events.
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = sync_channel(capacity.max(1));
    (EventSender { inner: tx }, EventReceiver { inner: rx })
}
