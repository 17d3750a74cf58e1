//! Backend readiness checks
//!
//! A backend counts as ready once its port has accepted a TCP connection.

use anyhow::Result;
use futures::future::join_all;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::config::BackendConfig;

/// Readiness wait configuration
#[derive(Clone, Debug)]
pub struct ReadinessConfig {
    /// Interval between probe rounds
    pub poll_interval: Duration,

    /// Timeout for a single connection attempt
    pub connect_timeout: Duration,

    /// Overall deadline; `None` waits forever
    pub total_timeout: Option<Duration>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
            total_timeout: None,
        }
    }
}

impl ReadinessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn total_timeout(mut self, deadline: Option<Duration>) -> Self {
        self.total_timeout = deadline;
        self
    }
}

impl From<&BackendConfig> for ReadinessConfig {
    fn from(config: &BackendConfig) -> Self {
        let total_timeout =
            (config.ready_timeout_secs > 0).then(|| Duration::from_secs(config.ready_timeout_secs));
        Self::new()
            .poll_interval(Duration::from_millis(config.poll_interval_ms))
            .total_timeout(total_timeout)
    }
}

/// Try a single connection to a local port
pub async fn probe(port: u16, connect_timeout: Duration) -> bool {
    matches!(
        timeout(connect_timeout, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

/// Poll every port until each one has accepted a connection
pub async fn wait_for_ports(ports: &[u16], config: &ReadinessConfig) -> Result<()> {
    let start = Instant::now();
    let mut pending: Vec<u16> = ports.to_vec();

    info!("Waiting for {} backend(s) to accept connections", pending.len());

    loop {
        let probes = pending.iter().map(|&port| async move {
            (port, probe(port, config.connect_timeout).await)
        });
        let results = join_all(probes).await;

        pending = results
            .into_iter()
            .filter_map(|(port, ready)| {
                if ready {
                    debug!("Backend on port {} is ready", port);
                    None
                } else {
                    Some(port)
                }
            })
            .collect();

        if pending.is_empty() {
            info!(
                "All backends ready after {}ms",
                start.elapsed().as_millis()
            );
            return Ok(());
        }

        if let Some(deadline) = config.total_timeout {
            if start.elapsed() >= deadline {
                anyhow::bail!(
                    "Backends not ready after {}s on port(s) {:?}",
                    deadline.as_secs_f64(),
                    pending
                );
            }
        }

        debug!("Still waiting for port(s) {:?}", pending);
        sleep(config.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn fast() -> ReadinessConfig {
        ReadinessConfig::new().poll_interval(Duration::from_millis(20))
    }

    async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_from_backend_config() {
        let config = ReadinessConfig::from(&BackendConfig {
            poll_interval_ms: 250,
            ready_timeout_secs: 3,
            ..Default::default()
        });
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.total_timeout, Some(Duration::from_secs(3)));

        let config = ReadinessConfig::from(&BackendConfig::default());
        assert_eq!(config.total_timeout, None);
    }

    #[tokio::test]
    async fn test_ready_ports() {
        let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ports = [a.local_addr().unwrap().port(), b.local_addr().unwrap().port()];

        wait_for_ports(&ports, &fast()).await.unwrap();
    }

    #[tokio::test]
    async fn test_port_that_comes_up_later() {
        let port = unused_port().await;
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            sleep(Duration::from_secs(5)).await;
            drop(listener);
        });

        let config = fast().total_timeout(Some(Duration::from_secs(5)));
        wait_for_ports(&[port], &config).await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_reports_pending_ports() {
        let port = unused_port().await;
        let config = fast().total_timeout(Some(Duration::from_millis(100)));

        let err = wait_for_ports(&[port], &config).await.unwrap_err();
        assert!(err.to_string().contains(&port.to_string()));
    }

    #[tokio::test]
    async fn test_no_ports_is_immediately_ready() {
        wait_for_ports(&[], &fast()).await.unwrap();
    }
}
