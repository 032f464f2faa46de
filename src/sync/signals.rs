// Host foreground/connectivity signals
//
// The embedding host (window manager glue, terminal UI, test) fires these;
// observed resources with the matching option revalidate on receipt.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Host regained foreground focus
    Focus,
    /// Host regained network connectivity
    Reconnect,
}

/// Broadcast hub for host events
#[derive(Debug, Clone)]
pub struct HostSignals {
    tx: broadcast::Sender<HostEvent>,
}

impl Default for HostSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSignals {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    pub fn focus(&self) {
        self.emit(HostEvent::Focus);
    }

    pub fn reconnect(&self) {
        self.emit(HostEvent::Reconnect);
    }

    pub fn emit(&self, event: HostEvent) {
        // No listeners is fine: nothing is being observed right now
        let _ = self.tx.send(event);
    }

    /// Number of live listeners (one per observing subscription and event kind)
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
