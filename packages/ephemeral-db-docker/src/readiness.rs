//! TCP readiness probing.

use std::time::Duration;

use ephemeral_db_core::HarnessError;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

/// Delay between connection attempts.
const PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Waits until `host:port` accepts a TCP connection or `deadline` passes.
///
/// `container_port` and `budget` (the whole readiness allowance the deadline
/// was derived from) are only used in the error.
pub async fn wait_for_port(
    host: &str,
    port: u16,
    container_port: u16,
    deadline: Instant,
    budget: Duration,
) -> Result<(), HarnessError> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => {
                tracing::debug!(host, port, "Port accepting connections");
                return Ok(());
            }
            Ok(Err(e)) => tracing::trace!(host, port, "Port not ready: {}", e),
            Err(_) => break,
        }
        sleep(PROBE_INTERVAL.min(deadline.saturating_duration_since(Instant::now()))).await;
    }
    Err(HarnessError::Readiness {
        port: container_port,
        timeout_ms: budget.as_millis() as u64,
    })
}
