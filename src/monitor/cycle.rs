//! Scan cycle engine
//!
//! One cycle evaluates every registered host against the current
//! transport, updates the registry in place and reports the transitions.
//! The central invariant: an event is produced if and only if a host's
//! reachability or transport type differs from its stored status.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::models::{ConnectionType, Host, HostRegistry, MonitorSettings, Status};
use crate::monitor::events::HostStatusEvent;

/// Runs one scan cycle over `registry`.
///
/// `prober` decides reachability for a single host; the service passes
/// the real TCP probe, tests pass scripted closures. Hosts are probed
/// sequentially in the registry's iteration order, and returned events
/// follow that same order.
///
/// With `transport == None` no probes run at all: every host is treated
/// as unreachable, because without a network path retries only burn
/// time. Hosts already stored as `{unreachable, None}` stay silent.
///
/// The mutated registry is not persisted here; the caller commits it as
/// a single unit after the cycle.
pub async fn run_cycle<F, Fut>(
    registry: &mut HostRegistry,
    settings: &MonitorSettings,
    transport: ConnectionType,
    mut prober: F,
) -> Vec<HostStatusEvent>
where
    F: FnMut(Host, Duration, NonZeroU32) -> Fut,
    Fut: Future<Output = bool>,
{
    if registry.is_empty() {
        tracing::debug!("no hosts to check at this moment");
        return Vec::new();
    }

    let hosts: Vec<Host> = registry.keys().cloned().collect();
    let mut events = Vec::new();

    if transport == ConnectionType::None {
        tracing::debug!("no active connection, marking all hosts unreachable");

        for host in hosts {
            let current = Status::new(false, ConnectionType::None);
            record_transition(registry, &mut events, host, current);
        }

        return events;
    }

    tracing::debug!("starting reachability check via {}", transport.as_str());

    for host in hosts {
        let reachable = prober(
            host.clone(),
            settings.socket_timeout(),
            settings.max_attempts(),
        )
        .await;

        tracing::debug!(
            "{} is currently {} via {}",
            host,
            if reachable { "reachable" } else { "unreachable" },
            transport.as_str()
        );

        let current = Status::new(reachable, transport);
        record_transition(registry, &mut events, host, current);
    }

    tracing::debug!("reachability check finished, {} transition(s)", events.len());
    events
}

/// Replaces the stored status and appends an event when `current`
/// differs from it; otherwise leaves the registry entry untouched.
fn record_transition(
    registry: &mut HostRegistry,
    events: &mut Vec<HostStatusEvent>,
    host: Host,
    current: Status,
) {
    let Some(stored) = registry.get_mut(&host) else {
        return;
    };

    if *stored == current {
        return;
    }

    let event = HostStatusEvent::transition(host, stored, &current);
    *stored = current;
    events.push(event);
}
