//! hostwatch — TCP host reachability monitor
//!
//! Periodically probes configured host:port endpoints, tracks
//! reachability and network transport transitions, and publishes a
//! change event whenever either differs from the last persisted state:
//! - Bounded-retry TCP connect probing with per-attempt deadlines
//! - Diff-based change detection (notify on transitions, never on every
//!   scan)
//! - Durable host/status registry behind a pluggable key-value store
//! - Periodic and connectivity-change scan triggers with an
//!   at-most-one-cycle guard
//! - Broadcast or callback delivery of status change events

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod notifier;
pub mod scanner;
pub mod store;
pub mod transport;

pub use config::*;
pub use error::MonitorError;
pub use models::{ConnectionType, Host, HostRegistry, MonitorSettings, Status};
pub use monitor::{HostMonitor, HostStatusEvent, MonitorConfig, MonitorStatus, ProbeFn, run_cycle};
pub use notifier::{ChangeNotifier, ChannelNotifier};
pub use scanner::probe_host;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use transport::{resolve_transport, StaticTransport, TransportSource};
