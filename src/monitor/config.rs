//! Monitor configuration manager
//!
//! Typed accessor over a [`KeyValueStore`]. Fields load lazily from the
//! store on first access, mutations stage in memory, and [`save`] is the
//! single commit point flushing everything back as one atomic write.
//!
//! [`save`]: MonitorConfig::save

use std::collections::HashMap;
use std::io;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::MonitorError;
use crate::models::{Host, HostRegistry, MonitorSettings, Status};
use crate::store::KeyValueStore;

// store keys
const KEY_HOSTS: &str = "hosts";
const KEY_BROADCAST_CHANNEL: &str = "broadcastChannel";
const KEY_SOCKET_TIMEOUT: &str = "socketTimeoutMs";
const KEY_CHECK_INTERVAL: &str = "checkIntervalMs";
const KEY_MAX_ATTEMPTS: &str = "maxAttempts";

/// Staged view of the persisted monitor configuration.
pub struct MonitorConfig {
    store: Arc<dyn KeyValueStore>,
    hosts: Option<HostRegistry>,
    broadcast_channel: Option<String>,
    socket_timeout: Option<Duration>,
    check_interval: Option<Duration>,
    max_attempts: Option<NonZeroU32>,
}

impl MonitorConfig {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            hosts: None,
            broadcast_channel: None,
            socket_timeout: None,
            check_interval: None,
            max_attempts: None,
        }
    }

    /// The monitored hosts and their last-known status, loading from the
    /// store on first access. A corrupt stored registry falls back to
    /// empty with a logged warning.
    pub fn registry(&mut self) -> &HostRegistry {
        self.load_hosts()
    }

    fn registry_mut(&mut self) -> &mut HostRegistry {
        self.load_hosts()
    }

    fn load_hosts(&mut self) -> &mut HostRegistry {
        if self.hosts.is_none() {
            let registry = match self.store.get(KEY_HOSTS) {
                None => HostRegistry::new(),
                Some(json) => match decode_registry(&json) {
                    Ok(registry) => registry,
                    Err(err) => {
                        tracing::warn!(
                            "error while deserializing hosts map, ignoring stored values: {err}"
                        );
                        HostRegistry::new()
                    }
                },
            };
            self.hosts = Some(registry);
        }

        self.hosts.get_or_insert_with(HostRegistry::new)
    }

    /// Registers a host for monitoring with the default optimistic
    /// status. Re-adding a known host is a no-op; the change applies
    /// from the next scan cycle.
    pub fn add_host(&mut self, address: impl Into<String>, port: u16) -> &mut Self {
        let host = Host::new(address, port);
        self.registry_mut().entry(host).or_default();
        self
    }

    /// Deregisters a host. Removing an unknown host is a no-op; the
    /// change applies from the next scan cycle.
    pub fn remove_host(&mut self, address: &str, port: u16) -> &mut Self {
        self.registry_mut()
            .remove(&Host::new(address.to_string(), port));
        self
    }

    /// Deregisters every monitored host.
    pub fn remove_all_hosts(&mut self) -> &mut Self {
        self.registry_mut().clear();
        self
    }

    /// Applies cycle results back to the registry. Each status lands
    /// only if its host is still registered, so hosts removed while the
    /// cycle was probing stay removed. Returns the hosts that were
    /// still present.
    pub fn apply_cycle_results<'a, I>(&mut self, results: I) -> Vec<Host>
    where
        I: IntoIterator<Item = (&'a Host, Status)>,
    {
        let registry = self.registry_mut();
        let mut applied = Vec::new();

        for (host, status) in results {
            if let Some(stored) = registry.get_mut(host) {
                *stored = status;
                applied.push(host.clone());
            }
        }

        applied
    }

    pub fn broadcast_channel(&mut self) -> String {
        let store = Arc::clone(&self.store);
        self.broadcast_channel
            .get_or_insert_with(|| {
                store
                    .get(KEY_BROADCAST_CHANNEL)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(crate::config::default_broadcast_channel)
            })
            .clone()
    }

    pub fn set_broadcast_channel(
        &mut self,
        channel: impl Into<String>,
    ) -> Result<&mut Self, MonitorError> {
        let channel = channel.into();
        if channel.is_empty() {
            return Err(MonitorError::EmptyChannel);
        }
        self.broadcast_channel = Some(channel);
        Ok(self)
    }

    pub fn socket_timeout(&mut self) -> Duration {
        let store = Arc::clone(&self.store);
        *self.socket_timeout.get_or_insert_with(|| {
            load_millis(store.as_ref(), KEY_SOCKET_TIMEOUT)
                .filter(|d| !d.is_zero())
                .unwrap_or_else(crate::config::default_socket_timeout)
        })
    }

    pub fn set_socket_timeout(&mut self, timeout: Duration) -> Result<&mut Self, MonitorError> {
        if timeout.is_zero() {
            return Err(MonitorError::ZeroTimeout);
        }
        self.socket_timeout = Some(timeout);
        Ok(self)
    }

    pub fn check_interval(&mut self) -> Duration {
        let store = Arc::clone(&self.store);
        *self.check_interval.get_or_insert_with(|| {
            load_millis(store.as_ref(), KEY_CHECK_INTERVAL)
                .unwrap_or_else(crate::config::default_check_interval)
        })
    }

    /// Zero disables the periodic trigger.
    pub fn set_check_interval(&mut self, interval: Duration) -> &mut Self {
        self.check_interval = Some(interval);
        self
    }

    pub fn max_attempts(&mut self) -> NonZeroU32 {
        let store = Arc::clone(&self.store);
        *self.max_attempts.get_or_insert_with(|| {
            store
                .get(KEY_MAX_ATTEMPTS)
                .and_then(|v| v.parse::<u32>().ok())
                .and_then(NonZeroU32::new)
                .unwrap_or_else(crate::config::default_max_attempts)
        })
    }

    pub fn set_max_attempts(&mut self, attempts: NonZeroU32) -> &mut Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Assembles the current settings, loading unset fields from the
    /// store or their defaults. Loaded values already satisfy the
    /// settings invariants (empty channels and zero timeouts are
    /// filtered out at load time), so assembly cannot fail in practice.
    pub fn settings(&mut self) -> MonitorSettings {
        let channel = self.broadcast_channel();
        let timeout = self.socket_timeout();
        let interval = self.check_interval();
        let attempts = self.max_attempts();

        MonitorSettings::new()
            .with_broadcast_channel(channel)
            .and_then(|s| s.with_socket_timeout(timeout))
            .map(|s| s.with_check_interval(interval).with_max_attempts(attempts))
            .unwrap_or_default()
    }

    /// Stages every field of `settings` for the next [`save`].
    ///
    /// [`save`]: MonitorConfig::save
    pub fn set_settings(&mut self, settings: &MonitorSettings) -> &mut Self {
        self.broadcast_channel = Some(settings.broadcast_channel().to_string());
        self.socket_timeout = Some(settings.socket_timeout());
        self.check_interval = Some(settings.check_interval());
        self.max_attempts = Some(settings.max_attempts());
        self
    }

    /// Commits all loaded and staged state to the store as one atomic
    /// write. Fields never touched in this instance are left as stored.
    pub fn save(&mut self) -> Result<(), MonitorError> {
        tracing::debug!("saving monitor configuration");

        let mut entries: Vec<(String, String)> = Vec::new();

        if let Some(hosts) = &self.hosts {
            entries.push((KEY_HOSTS.to_string(), encode_registry(hosts)?));
        }
        if let Some(channel) = &self.broadcast_channel {
            entries.push((KEY_BROADCAST_CHANNEL.to_string(), channel.clone()));
        }
        if let Some(timeout) = self.socket_timeout {
            entries.push((
                KEY_SOCKET_TIMEOUT.to_string(),
                timeout.as_millis().to_string(),
            ));
        }
        if let Some(interval) = self.check_interval {
            entries.push((
                KEY_CHECK_INTERVAL.to_string(),
                interval.as_millis().to_string(),
            ));
        }
        if let Some(attempts) = self.max_attempts {
            entries.push((KEY_MAX_ATTEMPTS.to_string(), attempts.to_string()));
        }

        if entries.is_empty() {
            return Ok(());
        }

        self.store.put_many(&entries)?;
        Ok(())
    }

    /// Clears all persisted and staged configuration unconditionally.
    pub fn reset(&mut self) -> Result<(), MonitorError> {
        tracing::debug!("resetting monitor configuration");
        self.store.clear()?;
        self.hosts = None;
        self.broadcast_channel = None;
        self.socket_timeout = None;
        self.check_interval = None;
        self.max_attempts = None;
        Ok(())
    }
}

fn load_millis(store: &dyn KeyValueStore, key: &str) -> Option<Duration> {
    store
        .get(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Serializes the registry as a JSON object keyed by `"address:port"`.
fn encode_registry(registry: &HostRegistry) -> Result<String, io::Error> {
    let by_key: HashMap<String, &Status> = registry
        .iter()
        .map(|(host, status)| (host.key(), status))
        .collect();

    serde_json::to_string(&by_key).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Parses the registry wire form. Any malformed key or value rejects the
/// whole mapping, matching the recovery policy of treating a corrupt
/// registry as empty.
fn decode_registry(json: &str) -> Result<HostRegistry, io::Error> {
    let by_key: HashMap<String, Status> =
        serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut registry = HostRegistry::with_capacity(by_key.len());
    for (key, status) in by_key {
        let host = Host::from_key(&key).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed host key '{key}'"),
            )
        })?;
        registry.insert(host, status);
    }

    Ok(registry)
}
