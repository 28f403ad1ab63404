/// Single-endpoint HTTP health check with retries
///
/// Used by the `health` command and by the Dockerfile flow of `up`. Retries
/// give a freshly started container time to come up.

use indicatif::ProgressBar;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub message: String,
}

/// Build the URL to check from the `health` command options
pub fn build_url(url: &str, port: Option<u16>, path: &str) -> String {
    let mut base = url.trim_end_matches('/').to_string();
    if let Some(port) = port {
        base = format!("{}:{}", base, port);
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{}", base);
    }

    if path.is_empty() {
        base
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// GET `url` until it answers 2xx or `max_retries` attempts are used up.
/// Returns the outcome of the last attempt.
pub async fn check_health(
    url: &str,
    max_retries: u32,
    timeout: Duration,
    delay: Duration,
    progress: Option<&ProgressBar>,
) -> HealthCheckResult {
    let attempts = max_retries.max(1);

    let client = match reqwest::Client::builder()
        .user_agent(format!("devmate/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return HealthCheckResult {
                success: false,
                status_code: None,
                message: format!("Failed to build HTTP client: {}", e),
            }
        }
    };

    let mut last = HealthCheckResult {
        success: false,
        status_code: None,
        message: "Service was not checked".to_string(),
    };

    for attempt in 1..=attempts {
        if let Some(pb) = progress {
            pb.set_message(format!("Checking health ({}/{})", attempt, attempts));
        }

        let start = Instant::now();
        last = match client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                let elapsed = start.elapsed().as_secs_f64();
                if let Some(pb) = progress {
                    pb.finish_and_clear();
                }
                return HealthCheckResult {
                    success: true,
                    status_code: Some(response.status().as_u16()),
                    message: format!("Service is healthy (responded in {:.2}s)", elapsed),
                };
            }
            Ok(response) => HealthCheckResult {
                success: false,
                status_code: Some(response.status().as_u16()),
                message: "Service returned non-2xx status".to_string(),
            },
            Err(e) => HealthCheckResult {
                success: false,
                status_code: None,
                message: format!("Service is not reachable: {}", e),
            },
        };

        debug!(url, attempt, message = %last.message, "Health check attempt failed");

        if let Some(pb) = progress {
            pb.inc(1);
        }

        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer every connection with a fixed HTTP status line
    async fn serve(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status_line
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        port
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("http://localhost", None, "/"), "http://localhost/");
        assert_eq!(build_url("localhost", Some(8080), "/health"), "http://localhost:8080/health");
        assert_eq!(build_url("https://example.com/", None, "status"), "https://example.com/status");
    }

    #[tokio::test]
    async fn test_healthy_endpoint() {
        let port = serve("200 OK").await;
        let url = format!("http://127.0.0.1:{}/", port);

        let result = check_health(&url, 3, Duration::from_secs(2), Duration::ZERO, None).await;
        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.message.starts_with("Service is healthy"));
    }

    #[tokio::test]
    async fn test_non_2xx_endpoint() {
        let port = serve("503 Service Unavailable").await;
        let url = format!("http://127.0.0.1:{}/", port);

        let result = check_health(&url, 2, Duration::from_secs(2), Duration::ZERO, None).await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(503));
        assert_eq!(result.message, "Service returned non-2xx status");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/", port);

        let result = check_health(&url, 1, Duration::from_secs(1), Duration::ZERO, None).await;
        assert!(!result.success);
        assert_eq!(result.status_code, None);
        assert!(result.message.starts_with("Service is not reachable"));
    }
}
