//! Configuration defaults for the host reachability monitor

use std::num::NonZeroU32;
use std::time::Duration;

/// Default channel name for status change events.
pub const DEFAULT_BROADCAST_CHANNEL: &str = "hostwatch.status";

/// Default per-attempt TCP connect timeout.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default scan interval. Zero means no periodic scans until configured.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::ZERO;

/// Default connect attempts per host before it counts as unreachable.
pub const DEFAULT_MAX_ATTEMPTS: NonZeroU32 = match NonZeroU32::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Capacity of the broadcast notifier's event buffer.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(name: &str, default: u64, min: u64, max: u64) -> u64 {
    match env_var(name).and_then(|v| v.parse::<u64>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_u32(name: &str, default: u32, min: u32, max: u32) -> u32 {
    match env_var(name).and_then(|v| v.parse::<u32>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

/// Runtime-tunable default connect timeout.
/// Env: `HOSTWATCH_SOCKET_TIMEOUT_MS`
pub fn default_socket_timeout() -> Duration {
    Duration::from_millis(env_parse_u64(
        "HOSTWATCH_SOCKET_TIMEOUT_MS",
        DEFAULT_SOCKET_TIMEOUT.as_millis() as u64,
        1,
        60_000,
    ))
}

/// Runtime-tunable default scan interval.
/// Env: `HOSTWATCH_CHECK_INTERVAL_MS` (0 disables periodic scans)
pub fn default_check_interval() -> Duration {
    Duration::from_millis(env_parse_u64(
        "HOSTWATCH_CHECK_INTERVAL_MS",
        DEFAULT_CHECK_INTERVAL.as_millis() as u64,
        0,
        86_400_000,
    ))
}

/// Runtime-tunable default connect attempt count.
/// Env: `HOSTWATCH_MAX_ATTEMPTS`
pub fn default_max_attempts() -> NonZeroU32 {
    let raw = env_parse_u32("HOSTWATCH_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS.get(), 1, 10);
    NonZeroU32::new(raw).unwrap_or(DEFAULT_MAX_ATTEMPTS)
}

/// Runtime-tunable default broadcast channel.
/// Env: `HOSTWATCH_BROADCAST_CHANNEL`
pub fn default_broadcast_channel() -> String {
    env_var("HOSTWATCH_BROADCAST_CHANNEL")
        .unwrap_or_else(|| DEFAULT_BROADCAST_CHANNEL.to_string())
}
