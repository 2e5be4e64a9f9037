//! TCP reachability probing

use std::num::NonZeroU32;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::models::Host;

/// Checks whether `host` accepts a TCP connection, retrying up to
/// `max_attempts` times with `timeout` as the per-attempt deadline.
///
/// The first successful connect short-circuits to `true`; attempts run
/// back to back with no delay between them. Connection refusal,
/// timeouts, name resolution failures and every other I/O error count as
/// a failed attempt, never as an error: the probe observes reachability,
/// it does not diagnose. Each attempt's socket is dropped before the
/// next one starts.
pub async fn probe_host(host: &Host, timeout: Duration, max_attempts: NonZeroU32) -> bool {
    for attempt in 1..=max_attempts.get() {
        if probe_once(host, timeout).await {
            tracing::trace!(
                "{} reachable on attempt {}/{}",
                host,
                attempt,
                max_attempts
            );
            return true;
        }
    }

    tracing::trace!("{} unreachable after {} attempts", host, max_attempts);
    false
}

/// One TCP connect attempt with a deadline.
async fn probe_once(host: &Host, timeout: Duration) -> bool {
    let target = (host.address(), host.port());

    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}
