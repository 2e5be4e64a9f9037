//! CLI argument parsing
//!
//! Hand-rolled parsing, one pass over the args with explicit flag
//! handling.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Result;

use crate::models::ConnectionType;

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 30;

/// Scan options shared by `check` and `watch`. `None` keeps the
/// persisted or default value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub transport: Option<ConnectionType>,
    pub timeout: Option<Duration>,
    pub attempts: Option<NonZeroU32>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CliCommand {
    HostsAdd {
        address: String,
        port: u16,
    },
    HostsRemove {
        address: String,
        port: u16,
    },
    HostsClear,
    HostsList,
    Check {
        options: ScanOptions,
    },
    Watch {
        interval: Duration,
        options: ScanOptions,
    },
    Reset,
    Help,
    Version,
}

pub fn version_text() -> String {
    format!("hostwatch {}", env!("CARGO_PKG_VERSION"))
}

pub fn usage_text() -> String {
    format!(
        "{version}
TCP host reachability monitor

Usage:
  hostwatch hosts add <address> <port>
  hostwatch hosts remove <address> <port>
  hostwatch hosts list
  hostwatch hosts clear
  hostwatch check [options]
  hostwatch watch [--interval <SECONDS>] [options]
  hostwatch reset
  hostwatch --help
  hostwatch --version

Options:
  -t, --transport <KIND>  Transport to report in events: wifi, mobile or none (default: wifi)
      --timeout <MS>      Per-attempt connect timeout in milliseconds
      --attempts <N>      Connect attempts per host before it counts as unreachable
  -i, --interval <SECS>   Watch: seconds between scans (default: {default_interval})
  -h, --help              Show this help text
  -V, --version           Show version",
        version = version_text(),
        default_interval = DEFAULT_WATCH_INTERVAL_SECS
    )
}

fn parse_port_arg(raw: &str) -> Result<u16> {
    raw.parse::<u16>().ok().filter(|p| *p > 0).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid port '{}'. Expected 1-65535.\n\n{}",
            raw,
            usage_text()
        )
    })
}

fn parse_secs_arg(flag: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid value for {}: '{}'. Expected a non-negative integer.\n\n{}",
            flag,
            raw,
            usage_text()
        )
    })
}

fn parse_millis_arg(flag: &str, raw: &str) -> Result<Duration> {
    raw.parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid value for {}: '{}'. Expected a positive integer.\n\n{}",
                flag,
                raw,
                usage_text()
            )
        })
}

fn parse_attempts_arg(flag: &str, raw: &str) -> Result<NonZeroU32> {
    raw.parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid value for {}: '{}'. Expected a positive integer.\n\n{}",
                flag,
                raw,
                usage_text()
            )
        })
}

fn parse_transport_arg(raw: &str) -> Result<ConnectionType> {
    match raw.to_ascii_lowercase().as_str() {
        "wifi" => Ok(ConnectionType::Wifi),
        "mobile" => Ok(ConnectionType::Mobile),
        "none" => Ok(ConnectionType::None),
        other => Err(anyhow::anyhow!(
            "Invalid transport '{}'. Expected wifi, mobile or none.\n\n{}",
            other,
            usage_text()
        )),
    }
}

fn unexpected(arg: &str) -> anyhow::Error {
    anyhow::anyhow!("Unexpected argument '{}'.\n\n{}", arg, usage_text())
}

fn missing(what: &str) -> anyhow::Error {
    anyhow::anyhow!("Missing {}.\n\n{}", what, usage_text())
}

/// Parses CLI-style args (without the program name) into a command.
pub fn parse_cli_args<I, S>(args: I) -> Result<CliCommand>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();

    let Some(first) = args.first() else {
        return Ok(CliCommand::Help);
    };

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(CliCommand::Help),
        "-V" | "--version" | "version" => Ok(CliCommand::Version),
        "hosts" => parse_hosts_command(&args[1..]),
        "check" => {
            let (options, rest) = parse_scan_options(&args[1..])?;
            if let Some(extra) = rest.first() {
                return Err(unexpected(extra));
            }
            Ok(CliCommand::Check { options })
        }
        "watch" => parse_watch_command(&args[1..]),
        "reset" => match args.get(1) {
            None => Ok(CliCommand::Reset),
            Some(extra) => Err(unexpected(extra)),
        },
        other => Err(unexpected(other)),
    }
}

fn parse_hosts_command(args: &[String]) -> Result<CliCommand> {
    let Some(action) = args.first() else {
        return Err(missing("hosts action (add, remove, list or clear)"));
    };

    match action.as_str() {
        "list" => Ok(CliCommand::HostsList),
        "clear" => Ok(CliCommand::HostsClear),
        "add" | "remove" => {
            let address = args.get(1).ok_or_else(|| missing("host address"))?.clone();
            let port = parse_port_arg(args.get(2).ok_or_else(|| missing("port"))?)?;
            if let Some(extra) = args.get(3) {
                return Err(unexpected(extra));
            }

            if action == "add" {
                Ok(CliCommand::HostsAdd { address, port })
            } else {
                Ok(CliCommand::HostsRemove { address, port })
            }
        }
        other => Err(unexpected(other)),
    }
}

/// Consumes the scan option flags, returning the unconsumed remainder.
fn parse_scan_options(args: &[String]) -> Result<(ScanOptions, Vec<String>)> {
    let mut options = ScanOptions::default();
    let mut rest = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-t" | "--transport" => {
                let raw = iter.next().ok_or_else(|| missing("transport value"))?;
                options.transport = Some(parse_transport_arg(raw)?);
            }
            "--timeout" => {
                let raw = iter.next().ok_or_else(|| missing("timeout value"))?;
                options.timeout = Some(parse_millis_arg("--timeout", raw)?);
            }
            "--attempts" => {
                let raw = iter.next().ok_or_else(|| missing("attempts value"))?;
                options.attempts = Some(parse_attempts_arg("--attempts", raw)?);
            }
            _ => rest.push(arg.clone()),
        }
    }

    Ok((options, rest))
}

fn parse_watch_command(args: &[String]) -> Result<CliCommand> {
    let (options, rest) = parse_scan_options(args)?;

    let mut interval = Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS);
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-i" | "--interval" => {
                let raw = iter.next().ok_or_else(|| missing("interval value"))?;
                interval = Duration::from_secs(parse_secs_arg("--interval", raw)?);
            }
            other => return Err(unexpected(other)),
        }
    }

    Ok(CliCommand::Watch { interval, options })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_shows_help() {
        let command = parse_cli_args(Vec::<String>::new()).expect("empty args parse");
        assert_eq!(command, CliCommand::Help);
    }

    #[test]
    fn test_hosts_add() {
        let command =
            parse_cli_args(["hosts", "add", "svc.example.com", "443"]).expect("should parse");
        assert_eq!(
            command,
            CliCommand::HostsAdd {
                address: "svc.example.com".to_string(),
                port: 443
            }
        );
    }

    #[test]
    fn test_hosts_add_rejects_bad_port() {
        assert!(parse_cli_args(["hosts", "add", "svc.example.com", "0"]).is_err());
        assert!(parse_cli_args(["hosts", "add", "svc.example.com", "70000"]).is_err());
        assert!(parse_cli_args(["hosts", "add", "svc.example.com"]).is_err());
    }

    #[test]
    fn test_check_with_options() {
        let command = parse_cli_args(["check", "--transport", "mobile", "--timeout", "500"])
            .expect("should parse");
        assert_eq!(
            command,
            CliCommand::Check {
                options: ScanOptions {
                    transport: Some(ConnectionType::Mobile),
                    timeout: Some(Duration::from_millis(500)),
                    attempts: None,
                }
            }
        );
    }

    #[test]
    fn test_check_rejects_unknown_transport() {
        assert!(parse_cli_args(["check", "--transport", "carrier-pigeon"]).is_err());
    }

    #[test]
    fn test_check_rejects_zero_timeout() {
        assert!(parse_cli_args(["check", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_check_rejects_zero_attempts() {
        assert!(parse_cli_args(["check", "--attempts", "0"]).is_err());
    }

    #[test]
    fn test_watch_defaults() {
        let command = parse_cli_args(["watch"]).expect("should parse");
        assert_eq!(
            command,
            CliCommand::Watch {
                interval: Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS),
                options: ScanOptions::default(),
            }
        );
    }

    #[test]
    fn test_watch_with_flags() {
        let command = parse_cli_args(["watch", "-i", "5", "-t", "mobile", "--attempts", "2"])
            .expect("should parse");
        assert_eq!(
            command,
            CliCommand::Watch {
                interval: Duration::from_secs(5),
                options: ScanOptions {
                    transport: Some(ConnectionType::Mobile),
                    timeout: None,
                    attempts: NonZeroU32::new(2),
                }
            }
        );
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(parse_cli_args(["frobnicate"]).is_err());
        assert!(parse_cli_args(["reset", "extra"]).is_err());
        assert!(parse_cli_args(["check", "surplus"]).is_err());
    }
}
