//! Monitoring events
//!
//! Event and status types published to consumers.

use serde::{Deserialize, Serialize};

use crate::models::{ConnectionType, Host, Status};

/// A detected reachability or transport transition for one host.
///
/// Carries the full before/after pair so consumers can tell what changed
/// without keeping their own history. Built once per transition and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatusEvent {
    pub host: Host,
    pub previous_reachable: bool,
    pub reachable: bool,
    pub previous_connection_type: ConnectionType,
    pub connection_type: ConnectionType,
}

impl HostStatusEvent {
    /// Builds the event for a `previous -> current` status transition.
    pub fn transition(host: Host, previous: &Status, current: &Status) -> Self {
        Self {
            host,
            previous_reachable: previous.reachable,
            reachable: current.reachable,
            previous_connection_type: previous.connection_type,
            connection_type: current.connection_type,
        }
    }

    pub fn reachability_changed(&self) -> bool {
        self.previous_reachable != self.reachable
    }

    pub fn connection_type_changed(&self) -> bool {
        self.previous_connection_type != self.connection_type
    }
}

/// Point-in-time snapshot of the monitor service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub is_running: bool,
    pub check_interval_ms: u64,
    pub cycle_count: u32,
    pub last_cycle_time: Option<String>,
    pub hosts_monitored: usize,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            check_interval_ms: 0,
            cycle_count: 0,
            last_cycle_time: None,
            hosts_monitored: 0,
        }
    }
}
