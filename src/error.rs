//! Library error type
//!
//! Contract violations and persistence failures surface as
//! [`MonitorError`]. Probe failures are data (`false`), never errors, so
//! this enum only covers configuration mistakes, duplicate starts, and
//! store commit failures.

use std::io;

use thiserror::Error;

/// Errors raised by the monitor's configuration and lifecycle seams.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A broadcast channel name was empty.
    #[error("broadcast channel name must not be empty")]
    EmptyChannel,

    /// A socket timeout of zero was supplied.
    #[error("socket timeout must be greater than zero")]
    ZeroTimeout,

    /// `start` was called while the monitor was already running.
    #[error("monitor is already running")]
    AlreadyRunning,

    /// A persistence commit failed.
    #[error("store error: {0}")]
    Store(#[from] io::Error),
}
