//! Transport type resolution
//!
//! Maps platform connectivity signals onto the closed [`ConnectionType`]
//! enumeration the monitor understands.

use crate::models::ConnectionType;

/// Resolves a platform connectivity signal to a [`ConnectionType`].
///
/// `connected = false` always yields `None`. Transport kinds the monitor
/// does not model map to `None` with a logged warning, never a failure:
/// a platform growing a new transport kind must not crash the monitor.
pub fn resolve_transport(connected: bool, kind: &str) -> ConnectionType {
    if !connected {
        return ConnectionType::None;
    }

    match kind.to_ascii_lowercase().as_str() {
        "wifi" | "wlan" => ConnectionType::Wifi,
        "mobile" | "cellular" | "wwan" => ConnectionType::Mobile,
        other => {
            tracing::warn!("unsupported transport kind '{other}', treating as no connection");
            ConnectionType::None
        }
    }
}

/// Supplies the transport type in effect when a periodic scan fires.
///
/// The trigger source owns connectivity detection; the monitor only asks
/// for the current answer. Implemented for plain closures and for the
/// fixed [`StaticTransport`] source.
pub trait TransportSource: Send + Sync {
    fn current(&self) -> ConnectionType;
}

impl<F> TransportSource for F
where
    F: Fn() -> ConnectionType + Send + Sync,
{
    fn current(&self) -> ConnectionType {
        self()
    }
}

/// Transport source that always reports the same transport. Useful for
/// hosts with a fixed uplink and for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticTransport(pub ConnectionType);

impl TransportSource for StaticTransport {
    fn current(&self) -> ConnectionType {
        self.0
    }
}
