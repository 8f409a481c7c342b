use cowork_protocol::retry::is_retryable_transport_error;
use cowork_protocol::BackoffPolicy;
use tracing::{info, warn};

use crate::connection::{ConnectOutcome, ConnectionManager};
use crate::error::ConnectError;

/// Calls [`ConnectionManager::connect`] until it succeeds or `policy` gives
/// up, sleeping with exponential backoff between attempts.
///
/// Permanent failures (bad URL, 4xx handshake) and a closing connection stop
/// immediately.
pub async fn connect_with_backoff(
    connection: &ConnectionManager,
    policy: BackoffPolicy,
) -> Result<ConnectOutcome, ConnectError> {
    let mut attempt = 0;
    loop {
        let error = match connection.connect().await {
            Ok(outcome) => return Ok(outcome),
            Err(error) => error,
        };

        let retryable = error.transport().is_some_and(is_retryable_transport_error);
        if !retryable || attempt >= policy.max_retries {
            return Err(error);
        }

        let delay = policy.delay_for(attempt);
        warn!(%error, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying agent connection");
        tokio::time::sleep(delay).await;
        attempt += 1;
        info!(attempt, "reconnecting to agent");
    }
}
