//! CLI command dispatch and handlers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{parse_cli_args, usage_text, version_text, CliCommand, ScanOptions};
use crate::models::ConnectionType;
use crate::monitor::events::HostStatusEvent;
use crate::monitor::{HostMonitor, MonitorConfig};
use crate::notifier::ChangeNotifier;
use crate::store::{JsonFileStore, KeyValueStore};
use crate::transport::StaticTransport;
use crate::log_stderr;

/// Run the app by parsing CLI-style args and dispatching the command.
pub async fn run<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let command = parse_cli_args(args)?;
    execute_command(command).await
}

/// Execute a pre-parsed command. This is reusable for non-CLI entrypoints.
pub async fn execute_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Help => {
            println!("{}", usage_text());
            Ok(())
        }
        CliCommand::Version => {
            println!("{}", version_text());
            Ok(())
        }
        CliCommand::HostsAdd { address, port } => handle_hosts_add(&address, port),
        CliCommand::HostsRemove { address, port } => handle_hosts_remove(&address, port),
        CliCommand::HostsClear => handle_hosts_clear(),
        CliCommand::HostsList => handle_hosts_list(),
        CliCommand::Check { options } => handle_check(options).await,
        CliCommand::Watch { interval, options } => {
            handle_watch(interval.as_secs(), options).await
        }
        CliCommand::Reset => handle_reset(),
    }
}

fn state_file_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not find config directory")?;
    Ok(base.join("hostwatch").join("state.json"))
}

fn open_store() -> Result<Arc<JsonFileStore>> {
    let path = state_file_path()?;
    let store = JsonFileStore::open(path).context("opening state store")?;
    Ok(Arc::new(store))
}

fn handle_hosts_add(address: &str, port: u16) -> Result<()> {
    let store = open_store()?;
    let mut config = MonitorConfig::new(store);
    config.add_host(address, port);
    config.save()?;
    println!("monitoring {address}:{port}");
    Ok(())
}

fn handle_hosts_remove(address: &str, port: u16) -> Result<()> {
    let store = open_store()?;
    let mut config = MonitorConfig::new(store);
    config.remove_host(address, port);
    config.save()?;
    println!("stopped monitoring {address}:{port}");
    Ok(())
}

fn handle_hosts_clear() -> Result<()> {
    let store = open_store()?;
    let mut config = MonitorConfig::new(store);
    config.remove_all_hosts();
    config.save()?;
    println!("cleared all monitored hosts");
    Ok(())
}

fn handle_hosts_list() -> Result<()> {
    let store = open_store()?;
    let mut config = MonitorConfig::new(store);

    let mut hosts: Vec<String> = config
        .registry()
        .iter()
        .map(|(host, status)| {
            format!(
                "{host}  {} via {}",
                if status.reachable {
                    "reachable"
                } else {
                    "unreachable"
                },
                status.connection_type.as_str()
            )
        })
        .collect();
    hosts.sort();

    if hosts.is_empty() {
        println!("no monitored hosts");
    } else {
        for line in hosts {
            println!("{line}");
        }
    }
    Ok(())
}

fn handle_reset() -> Result<()> {
    let store = open_store()?;
    MonitorConfig::new(store).reset()?;
    println!("monitor state reset");
    Ok(())
}

/// Stages one-shot option overrides so the next cycle picks them up.
fn apply_scan_options(store: Arc<dyn KeyValueStore>, options: &ScanOptions) -> Result<()> {
    if options.timeout.is_none() && options.attempts.is_none() {
        return Ok(());
    }

    let mut config = MonitorConfig::new(store);
    if let Some(timeout) = options.timeout {
        config.set_socket_timeout(timeout)?;
    }
    if let Some(attempts) = options.attempts {
        config.set_max_attempts(attempts);
    }
    config.save()?;
    Ok(())
}

fn print_event(_channel: &str, event: &HostStatusEvent) {
    let reachability = match (event.previous_reachable, event.reachable) {
        (false, true) => "came up",
        (true, false) => "went down",
        _ => "transport changed",
    };
    println!(
        "{} {} ({} -> {})",
        event.host,
        reachability,
        event.previous_connection_type.as_str(),
        event.connection_type.as_str()
    );
}

async fn handle_check(options: ScanOptions) -> Result<()> {
    let store = open_store()?;
    apply_scan_options(Arc::clone(&store) as Arc<dyn KeyValueStore>, &options)?;

    let transport = options.transport.unwrap_or(ConnectionType::Wifi);
    let monitor = HostMonitor::new(
        store,
        Arc::new(print_event) as Arc<dyn ChangeNotifier>,
        Arc::new(StaticTransport(transport)),
    );

    let events = monitor.check_now(transport).await?;
    let hosts = monitor.hosts().await;

    if hosts.is_empty() {
        println!("no monitored hosts, add one with: hostwatch hosts add <address> <port>");
        return Ok(());
    }

    if events.is_empty() {
        println!("checked {} host(s), no transitions", hosts.len());
    } else {
        println!(
            "checked {} host(s), {} transition(s)",
            hosts.len(),
            events.len()
        );
    }

    for (host, status) in hosts {
        println!(
            "{host}  {} via {}",
            if status.reachable {
                "reachable"
            } else {
                "unreachable"
            },
            status.connection_type.as_str()
        );
    }
    Ok(())
}

async fn handle_watch(interval_secs: u64, options: ScanOptions) -> Result<()> {
    let store = open_store()?;
    apply_scan_options(Arc::clone(&store) as Arc<dyn KeyValueStore>, &options)?;

    let transport = options.transport.unwrap_or(ConnectionType::Wifi);
    let monitor = HostMonitor::new(
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
        Arc::new(print_event) as Arc<dyn ChangeNotifier>,
        Arc::new(StaticTransport(transport)),
    );

    let settings = {
        let mut config = MonitorConfig::new(store);
        config.settings()
    }
    .with_check_interval(std::time::Duration::from_secs(interval_secs));

    monitor.start(settings).await?;
    log_stderr!("watching, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    monitor.stop();
    let status = monitor.status().await;
    log_stderr!(
        "stopped after {} scan cycle(s) over {} host(s)",
        status.cycle_count,
        status.hosts_monitored
    );
    Ok(())
}
