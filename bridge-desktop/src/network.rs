//! Network Monitoring Implementation

use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "1.1.1.1:53";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Desktop network monitor
///
/// Desktops do not expose metering in a portable way, so the monitor only
/// answers "connected or not" by opening a TCP connection to a probe address.
/// Point the probe at the sync endpoint to test reachability of the remote
/// itself.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
}

impl DesktopNetworkMonitor {
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_ADDR, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_probe(probe_addr: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            probe_timeout,
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match core_async::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;
        debug!(status = ?status, probe = %self.probe_addr, "Network probe finished");

        Ok(NetworkInfo {
            status,
            network_type: (status == NetworkStatus::Connected).then_some(NetworkType::Other),
            is_metered: false,
            is_expensive: false,
        })
    }

    async fn is_metered(&self) -> bool {
        false
    }
}
