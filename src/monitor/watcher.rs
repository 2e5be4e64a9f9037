//! Host monitor service
//!
//! Owns the configuration, runs scan cycles and publishes transitions.
//! One service value is one monitor: callers hold it (or a clone, which
//! shares all state) instead of going through process-wide globals.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::MonitorError;
use crate::models::{ConnectionType, Host, MonitorSettings, Status};
use crate::monitor::config::MonitorConfig;
use crate::monitor::cycle::run_cycle;
use crate::monitor::events::{HostStatusEvent, MonitorStatus};
use crate::notifier::ChangeNotifier;
use crate::scanner::probe_host;
use crate::store::KeyValueStore;
use crate::transport::TransportSource;

/// Boxed future returned by an injected prober.
pub type ProbeFuture = std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send>>;

/// Injectable reachability probe. The default is the TCP connect probe;
/// tests and embedders with their own probing swap it out.
pub type ProbeFn = Arc<
    dyn Fn(Host, Duration, std::num::NonZeroU32) -> ProbeFuture + Send + Sync,
>;

/// Reachability monitor service handle.
///
/// Cloning is cheap and clones share all state, so a clone can be moved
/// into spawned tasks, exactly like the watcher loop does internally.
#[derive(Clone)]
pub struct HostMonitor {
    config: Arc<Mutex<MonitorConfig>>,
    notifier: Arc<dyn ChangeNotifier>,
    transport: Arc<dyn TransportSource>,
    prober: ProbeFn,
    is_running: Arc<AtomicBool>,
    cycle_in_flight: Arc<AtomicBool>,
    cycle_count: Arc<AtomicU32>,
    run_generation: Arc<AtomicU32>,
    last_cycle_time: Arc<Mutex<Option<String>>>,
}

impl HostMonitor {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn ChangeNotifier>,
        transport: Arc<dyn TransportSource>,
    ) -> Self {
        Self {
            config: Arc::new(Mutex::new(MonitorConfig::new(store))),
            notifier,
            transport,
            prober: Arc::new(|host, timeout, attempts| {
                Box::pin(async move { probe_host(&host, timeout, attempts).await })
            }),
            is_running: Arc::new(AtomicBool::new(false)),
            cycle_in_flight: Arc::new(AtomicBool::new(false)),
            cycle_count: Arc::new(AtomicU32::new(0)),
            run_generation: Arc::new(AtomicU32::new(0)),
            last_cycle_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces the reachability probe.
    pub fn with_probe_fn(mut self, prober: ProbeFn) -> Self {
        self.prober = prober;
        self
    }

    /// Starts monitoring with `settings`: persists them, runs an
    /// immediate scan cycle, and arms the periodic trigger when the
    /// check interval is non-zero. With a zero interval the monitor
    /// stays armed for explicit [`check_now`] triggers only.
    ///
    /// Starting an already-running monitor is a usage error; the
    /// in-flight monitor is left untouched.
    ///
    /// [`check_now`]: HostMonitor::check_now
    pub async fn start(&self, settings: MonitorSettings) -> Result<(), MonitorError> {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MonitorError::AlreadyRunning);
        }

        {
            let mut config = self.config.lock().await;
            config.set_settings(&settings);
            if let Err(err) = config.save() {
                self.is_running.store(false, Ordering::SeqCst);
                return Err(err);
            }
        }

        self.cycle_count.store(0, Ordering::SeqCst);

        // A stale loop from a previous start/stop round exits as soon as
        // it sees a newer generation.
        let generation = self.run_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let monitor = self.clone();
        tokio::spawn(async move {
            let interval = settings.check_interval();
            tracing::info!(
                "host monitor started (check interval: {} ms)",
                interval.as_millis()
            );

            loop {
                if !monitor.loop_active(generation) {
                    break;
                }

                let transport = monitor.transport.current();
                if let Err(err) = monitor.check_now(transport).await {
                    tracing::warn!("scan cycle failed: {err}");
                }

                // Re-read the interval so configuration changes apply
                // from the next iteration.
                let interval = monitor.config.lock().await.check_interval();
                if interval.is_zero() {
                    tracing::debug!("periodic checks disabled, scan loop going idle");
                    break;
                }

                // Sleep in one-second steps so stop() takes effect quickly.
                let mut waited = Duration::ZERO;
                while waited < interval && monitor.loop_active(generation) {
                    let step = Duration::from_secs(1).min(interval - waited);
                    tokio::time::sleep(step).await;
                    waited += step;
                }
            }

            tracing::info!("host monitor scan loop finished");
        });

        Ok(())
    }

    fn loop_active(&self, generation: u32) -> bool {
        self.is_running.load(Ordering::SeqCst)
            && self.run_generation.load(Ordering::SeqCst) == generation
    }

    /// Stops the periodic trigger. The in-flight cycle, if any, runs to
    /// completion; interruption never happens mid-probe.
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Runs one scan cycle against the given transport and returns the
    /// published transitions.
    ///
    /// This is the entry point for external triggers (connectivity
    /// change listeners, schedulers). At most one cycle runs at a time:
    /// a trigger arriving while a cycle is in flight is dropped, not
    /// queued, so flapping connectivity cannot pile up scans.
    pub async fn check_now(
        &self,
        transport: ConnectionType,
    ) -> Result<Vec<HostStatusEvent>, MonitorError> {
        if self
            .cycle_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("scan cycle already in flight, dropping trigger");
            return Ok(Vec::new());
        }

        let result = self.run_guarded_cycle(transport).await;
        self.cycle_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_guarded_cycle(
        &self,
        transport: ConnectionType,
    ) -> Result<Vec<HostStatusEvent>, MonitorError> {
        // Snapshot the registry and settings, then release the lock for
        // the probing phase: configuration changes made meanwhile apply
        // from the next cycle.
        let (mut snapshot, settings) = {
            let mut config = self.config.lock().await;
            (config.registry().clone(), config.settings())
        };

        let prober = Arc::clone(&self.prober);
        let events = run_cycle(
            &mut snapshot,
            &settings,
            transport,
            move |host, timeout, attempts| (*prober)(host, timeout, attempts),
        )
        .await;

        let events = if events.is_empty() {
            events
        } else {
            let mut config = self.config.lock().await;

            // Keep the pre-cycle statuses so a failed save leaves the
            // in-memory registry matching the persisted snapshot.
            let previous: Vec<(Host, Status)> = events
                .iter()
                .filter_map(|e| config.registry().get(&e.host).map(|s| (e.host.clone(), *s)))
                .collect();

            let applied = config.apply_cycle_results(
                events
                    .iter()
                    .map(|e| (&e.host, Status::new(e.reachable, e.connection_type))),
            );

            if let Err(err) = config.save() {
                config.apply_cycle_results(previous.iter().map(|(h, s)| (h, *s)));
                return Err(err);
            }

            // Publish only transitions that were committed; hosts
            // removed while the cycle probed stay silent.
            let events: Vec<HostStatusEvent> = events
                .into_iter()
                .filter(|e| applied.contains(&e.host))
                .collect();
            for event in &events {
                self.notifier.publish(settings.broadcast_channel(), event);
            }
            events
        };

        self.cycle_count.fetch_add(1, Ordering::SeqCst);
        *self.last_cycle_time.lock().await = Some(chrono::Utc::now().to_rfc3339());

        Ok(events)
    }

    /// Registers a host for monitoring and persists the change. Applies
    /// from the next scan cycle.
    pub async fn add_host(
        &self,
        address: impl Into<String>,
        port: u16,
    ) -> Result<(), MonitorError> {
        let has_hosts = {
            let mut config = self.config.lock().await;
            config.add_host(address, port);
            config.save()?;
            !config.registry().is_empty()
        };
        self.apply_trigger_state(has_hosts);
        Ok(())
    }

    /// Deregisters a host and persists the change.
    pub async fn remove_host(&self, address: &str, port: u16) -> Result<(), MonitorError> {
        let has_hosts = {
            let mut config = self.config.lock().await;
            config.remove_host(address, port);
            config.save()?;
            !config.registry().is_empty()
        };
        self.apply_trigger_state(has_hosts);
        Ok(())
    }

    /// Deregisters every host and persists the change.
    pub async fn remove_all_hosts(&self) -> Result<(), MonitorError> {
        {
            let mut config = self.config.lock().await;
            config.remove_all_hosts();
            config.save()?;
        }
        self.apply_trigger_state(false);
        Ok(())
    }

    /// Last-known reachability for a host, or `None` when the host is
    /// not monitored.
    pub async fn is_reachable(&self, address: &str, port: u16) -> Option<bool> {
        let mut config = self.config.lock().await;
        config
            .registry()
            .get(&Host::new(address.to_string(), port))
            .map(|status| status.reachable)
    }

    /// Snapshot of the monitored hosts and their last-known status.
    pub async fn hosts(&self) -> Vec<(Host, Status)> {
        let mut config = self.config.lock().await;
        let mut hosts: Vec<(Host, Status)> = config
            .registry()
            .iter()
            .map(|(host, status)| (host.clone(), *status))
            .collect();
        hosts.sort_by_key(|(host, _)| host.key());
        hosts
    }

    /// Point-in-time service status.
    pub async fn status(&self) -> MonitorStatus {
        let (interval, hosts_monitored) = {
            let mut config = self.config.lock().await;
            (config.check_interval(), config.registry().len())
        };

        MonitorStatus {
            is_running: self.is_running(),
            check_interval_ms: interval.as_millis() as u64,
            cycle_count: self.cycle_count.load(Ordering::SeqCst),
            last_cycle_time: self.last_cycle_time.lock().await.clone(),
            hosts_monitored,
        }
    }

    /// Clears all persisted state and disarms the periodic trigger.
    pub async fn reset(&self) -> Result<(), MonitorError> {
        self.stop();
        self.config.lock().await.reset()
    }

    /// After a configuration commit: disarm the trigger when no hosts
    /// remain, otherwise fold the change in with an immediate cycle.
    fn apply_trigger_state(&self, has_hosts: bool) {
        if !self.is_running() {
            return;
        }

        if !has_hosts {
            tracing::debug!("no hosts left to monitor, disarming scan triggers");
            self.stop();
            return;
        }

        let monitor = self.clone();
        tokio::spawn(async move {
            let transport = monitor.transport.current();
            if let Err(err) = monitor.check_now(transport).await {
                tracing::warn!("post-save scan cycle failed: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionType;
    use crate::notifier::ChannelNotifier;
    use crate::store::MemoryStore;
    use crate::transport::StaticTransport;

    fn monitor_with(notifier: Arc<dyn ChangeNotifier>) -> HostMonitor {
        HostMonitor::new(
            Arc::new(MemoryStore::new()),
            notifier,
            Arc::new(StaticTransport(ConnectionType::Wifi)),
        )
    }

    fn scripted(reachable: bool) -> ProbeFn {
        Arc::new(move |_, _, _| Box::pin(async move { reachable }))
    }

    #[tokio::test]
    async fn test_duplicate_start_is_an_error() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")));

        monitor
            .start(MonitorSettings::default())
            .await
            .expect("first start should succeed");
        let second = monitor.start(MonitorSettings::default()).await;

        assert!(matches!(second, Err(MonitorError::AlreadyRunning)));
        assert!(monitor.is_running(), "failed start must not stop the monitor");

        monitor.stop();
    }

    #[tokio::test]
    async fn test_stop_then_start_is_allowed() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")));

        monitor
            .start(MonitorSettings::default())
            .await
            .expect("first start should succeed");
        monitor.stop();
        assert!(!monitor.is_running());

        monitor
            .start(MonitorSettings::default())
            .await
            .expect("restart after stop should succeed");
        monitor.stop();
    }

    #[tokio::test]
    async fn test_check_now_emits_on_reachability_flip() {
        let notifier = Arc::new(ChannelNotifier::new("hostwatch.status"));
        let mut receiver = notifier.subscribe();
        let monitor = monitor_with(notifier).with_probe_fn(scripted(false));

        monitor
            .add_host("svc.example.com", 443)
            .await
            .expect("add_host should succeed");

        let events = monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("cycle should succeed");

        assert_eq!(events.len(), 1);
        assert!(events[0].previous_reachable);
        assert!(!events[0].reachable);

        let published = receiver.recv().await.expect("event should be published");
        assert_eq!(published, events[0]);
    }

    #[tokio::test]
    async fn test_second_cycle_without_change_is_silent() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")))
            .with_probe_fn(scripted(false));

        monitor
            .add_host("svc.example.com", 443)
            .await
            .expect("add_host should succeed");

        let first = monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("cycle should succeed");
        assert_eq!(first.len(), 1, "first cycle must report the flip");

        let second = monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("cycle should succeed");
        assert!(second.is_empty(), "unchanged state must stay silent");
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_dropped() {
        use tokio::sync::Notify;

        let gate = Arc::new(Notify::new());
        let release = Arc::clone(&gate);
        let slow_prober: ProbeFn = Arc::new(move |_, _, _| {
            let gate = Arc::clone(&gate);
            Box::pin(async move {
                gate.notified().await;
                true
            })
        });

        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")))
            .with_probe_fn(slow_prober);
        monitor
            .add_host("svc.example.com", 443)
            .await
            .expect("add_host should succeed");

        let first = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.check_now(ConnectionType::Wifi).await })
        };

        // Give the first cycle time to take the guard and block in the
        // prober, then fire a second trigger.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("dropped trigger is not an error");
        assert!(second.is_empty(), "second trigger must be dropped, not queued");

        release.notify_one();
        let first = first
            .await
            .expect("task should join")
            .expect("first cycle should succeed");
        assert_eq!(first.len(), 1, "first cycle must still report its transition");
    }

    #[tokio::test]
    async fn test_is_reachable_unknown_host_is_none() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")));
        assert_eq!(monitor.is_reachable("unknown.example.com", 80).await, None);
    }

    #[tokio::test]
    async fn test_is_reachable_reflects_last_cycle() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")))
            .with_probe_fn(scripted(false));

        monitor
            .add_host("svc.example.com", 443)
            .await
            .expect("add_host should succeed");
        assert_eq!(
            monitor.is_reachable("svc.example.com", 443).await,
            Some(true),
            "before any cycle the optimistic default is reported"
        );

        monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("cycle should succeed");
        assert_eq!(monitor.is_reachable("svc.example.com", 443).await, Some(false));
    }

    #[tokio::test]
    async fn test_status_counts_cycles() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")))
            .with_probe_fn(scripted(true));

        monitor
            .add_host("svc.example.com", 443)
            .await
            .expect("add_host should succeed");
        monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("cycle should succeed");
        monitor
            .check_now(ConnectionType::Wifi)
            .await
            .expect("cycle should succeed");

        let status = monitor.status().await;
        assert_eq!(status.cycle_count, 2);
        assert_eq!(status.hosts_monitored, 1);
        assert!(status.last_cycle_time.is_some());
        assert!(!status.is_running);
    }

    #[tokio::test]
    async fn test_reset_clears_state_and_stops() {
        let monitor = monitor_with(Arc::new(ChannelNotifier::new("hostwatch.status")))
            .with_probe_fn(scripted(true));

        monitor
            .add_host("svc.example.com", 443)
            .await
            .expect("add_host should succeed");
        monitor
            .start(MonitorSettings::default())
            .await
            .expect("start should succeed");

        monitor.reset().await.expect("reset should succeed");

        assert!(!monitor.is_running());
        assert!(monitor.hosts().await.is_empty());
    }
}
