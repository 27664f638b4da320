//! [`AppWindow`] backed by a broadcast channel.

use tokio::sync::broadcast;
use tracing::trace;

use updraft_core::{AppWindow, WindowEvent};

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

/// Fans window events out to every connected event stream.
#[derive(Debug, Clone)]
pub struct BroadcastWindow {
    tx: broadcast::Sender<WindowEvent>,
}

impl BroadcastWindow {
    /// Creates a window buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.tx.subscribe()
    }

    /// Number of connected subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastWindow {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl AppWindow for BroadcastWindow {
    fn send(&self, event: WindowEvent) {
        let channel = event.channel();
        // Nobody listening is not an error.
        if self.tx.send(event).is_err() {
            trace!(channel, "No window subscribers");
        }
    }
}
