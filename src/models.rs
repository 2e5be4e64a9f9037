//! Data models for the host reachability monitor

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_BROADCAST_CHANNEL, DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_SOCKET_TIMEOUT,
};
use crate::error::MonitorError;

/// A monitored TCP endpoint: hostname or IP address plus port.
///
/// Equality and hashing cover both fields, so a `Host` is usable as a
/// registry key. The persistence key form is `"address:port"`; decoding
/// splits on the last `:` so IPv6 literals round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    address: String,
    port: u16,
}

impl Host {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Persistence key form, e.g. `"svc.example.com:443"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Parses the persistence key form produced by [`Host::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let (address, port) = key.rsplit_once(':')?;
        if address.is_empty() {
            return None;
        }
        let port = port.parse::<u16>().ok()?;
        Some(Self::new(address, port))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Network transport active at probe time. `None` means no connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    None,
    Wifi,
    Mobile,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::None => "NONE",
            ConnectionType::Wifi => "WIFI",
            ConnectionType::Mobile => "MOBILE",
        }
    }
}

/// Last-known reachability and transport for a monitored host.
///
/// A freshly registered host defaults to reachable over no transport, so
/// the first failed probe always produces a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub reachable: bool,
    pub connection_type: ConnectionType,
}

impl Status {
    pub fn new(reachable: bool, connection_type: ConnectionType) -> Self {
        Self {
            reachable,
            connection_type,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self {
            reachable: true,
            connection_type: ConnectionType::None,
        }
    }
}

/// Durable mapping from monitored hosts to their last-known status.
pub type HostRegistry = std::collections::HashMap<Host, Status>;

/// Validated monitor settings.
///
/// Fields are private and setters are fallible, so an invalid settings
/// value cannot be constructed: the channel is never empty, the timeout
/// never zero and the attempt count never below one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    broadcast_channel: String,
    socket_timeout: Duration,
    check_interval: Duration,
    max_attempts: NonZeroU32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            broadcast_channel: DEFAULT_BROADCAST_CHANNEL.to_string(),
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl MonitorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel name used when publishing status change events.
    pub fn with_broadcast_channel(
        mut self,
        channel: impl Into<String>,
    ) -> Result<Self, MonitorError> {
        let channel = channel.into();
        if channel.is_empty() {
            return Err(MonitorError::EmptyChannel);
        }
        self.broadcast_channel = channel;
        Ok(self)
    }

    /// Per-attempt TCP connect deadline. Must be non-zero.
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Result<Self, MonitorError> {
        if timeout.is_zero() {
            return Err(MonitorError::ZeroTimeout);
        }
        self.socket_timeout = timeout;
        Ok(self)
    }

    /// Period of the scan trigger. Zero disables periodic scans; cycles
    /// then run only on explicit triggers.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Connect attempts per host before the host counts as unreachable.
    pub fn with_max_attempts(mut self, attempts: NonZeroU32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn broadcast_channel(&self) -> &str {
        &self.broadcast_channel
    }

    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn max_attempts(&self) -> NonZeroU32 {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_round_trip() {
        let host = Host::new("svc.example.com", 443);
        assert_eq!(host.key(), "svc.example.com:443");
        assert_eq!(Host::from_key(&host.key()), Some(host));
    }

    #[test]
    fn test_host_key_round_trip_ipv6() {
        let host = Host::new("::1", 8080);
        let decoded = Host::from_key(&host.key()).expect("ipv6 key should decode");
        assert_eq!(decoded.address(), "::1");
        assert_eq!(decoded.port(), 8080);
    }

    #[test]
    fn test_host_from_key_rejects_garbage() {
        assert_eq!(Host::from_key("no-port-here"), None);
        assert_eq!(Host::from_key(":443"), None);
        assert_eq!(Host::from_key("host:notaport"), None);
        assert_eq!(Host::from_key("host:99999"), None);
    }

    #[test]
    fn test_status_default_is_optimistic() {
        let status = Status::default();
        assert!(status.reachable, "new hosts start assumed reachable");
        assert_eq!(status.connection_type, ConnectionType::None);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.broadcast_channel(), "hostwatch.status");
        assert_eq!(settings.socket_timeout(), Duration::from_millis(2000));
        assert_eq!(settings.check_interval(), Duration::ZERO);
        assert_eq!(settings.max_attempts().get(), 3);
    }

    #[test]
    fn test_settings_reject_empty_channel() {
        let result = MonitorSettings::new().with_broadcast_channel("");
        assert!(matches!(result, Err(MonitorError::EmptyChannel)));
    }

    #[test]
    fn test_settings_reject_zero_timeout() {
        let result = MonitorSettings::new().with_socket_timeout(Duration::ZERO);
        assert!(matches!(result, Err(MonitorError::ZeroTimeout)));
    }

    #[test]
    fn test_status_serde_wire_format() {
        let status = Status::new(false, ConnectionType::Wifi);
        let json = serde_json::to_string(&status).expect("status should serialize");
        assert_eq!(json, r#"{"reachable":false,"connectionType":"WIFI"}"#);
    }
}
