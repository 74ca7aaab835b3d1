use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::connectivity::ConnectivityHub;
use crate::config::ConnectivityConfig;
use crate::error::{Result, SyncError};

/// Polls TCP reachability of the API host and raises the connectivity signal
/// whenever the host goes from unreachable to reachable.
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    host: String,
    port: u16,
    interval: Duration,
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn for_base_url(base_url: &str, config: &ConnectivityConfig) -> Result<Self> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| SyncError::Config(format!("invalid base_url '{}': {}", base_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| SyncError::Config(format!("base_url '{}' has no host", base_url)))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| SyncError::Config(format!("base_url '{}' has no port", base_url)))?;

        Ok(Self {
            host,
            port,
            interval: Duration::from_secs(config.probe_interval_secs.max(1)),
            timeout: Duration::from_millis(config.probe_timeout_ms),
        })
    }

    pub fn target(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    pub async fn is_reachable(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        matches!(tokio::time::timeout(self.timeout, connect).await, Ok(Ok(_)))
    }

    /// Run the probe in the background until the returned task is aborted.
    pub fn spawn(self, hub: ConnectivityHub) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Watching reachability of {}:{}", self.host, self.port);
            let mut reachable = true;
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let now_reachable = self.is_reachable().await;
                match (reachable, now_reachable) {
                    (false, true) => {
                        info!("{} is reachable again", self.host);
                        hub.notify_restored();
                    }
                    (true, false) => warn!("{} is unreachable", self.host),
                    _ => debug!("{} reachable: {}", self.host, now_reachable),
                }
                reachable = now_reachable;
            }
        })
    }
}
