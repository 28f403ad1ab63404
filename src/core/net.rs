/// TCP reachability checks from the local host

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use crate::core::runtime::PortProbe;

/// Try to open a TCP connection; a timeout counts as closed
pub async fn check_host_port(host: &str, port: u16, timeout: Duration) -> bool {
    match time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "TCP connection failed");
            false
        }
        Err(_) => {
            debug!(host, port, ?timeout, "TCP connection timed out");
            false
        }
    }
}

pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn is_open(&self, host: &str, port: u16) -> bool {
        check_host_port(host, port, self.timeout).await
    }
}
