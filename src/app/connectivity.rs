use tokio::sync::broadcast;
use tracing::debug;

/// Process-wide "connectivity restored" signal.
///
/// Producers (the reachability probe, an embedding UI, tests) call
/// [`ConnectivityHub::notify_restored`]. The sync controller subscribes only
/// while it is degraded; a notification with no subscribers is discarded.
#[derive(Debug, Clone)]
pub struct ConnectivityHub {
    tx: broadcast::Sender<()>,
}

impl Default for ConnectivityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(4);
        Self { tx }
    }

    pub fn notify_restored(&self) {
        let delivered = self.tx.send(()).unwrap_or(0);
        debug!("Connectivity restored, delivered to {} listener(s)", delivered);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
