//! Reachability monitoring
//!
//! Scan cycles, configuration management and the monitor service.

pub mod config;
pub mod cycle;
pub mod events;
pub mod watcher;

pub use config::MonitorConfig;
pub use cycle::run_cycle;
pub use events::{HostStatusEvent, MonitorStatus};
pub use watcher::{HostMonitor, ProbeFn, ProbeFuture};
