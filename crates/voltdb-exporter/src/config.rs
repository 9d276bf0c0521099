//! Turns command-line arguments into a validated [`ExporterConfig`].

use std::path::Path;
use std::time::Duration;

use voltdb_exporter_core::config::{
    CategorySelection, ConfigError, ConnectSettings, Credentials, TlsConfig,
};
use voltdb_exporter_core::ExporterConfig;

use crate::Args;

pub(crate) fn build(args: &Args) -> Result<ExporterConfig, ConfigError> {
    let servers: Vec<String> = args
        .servers
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if servers.is_empty() {
        return Err(ConfigError::NoServers);
    }
    for server in &servers {
        check_server(server)?;
    }

    let categories = CategorySelection::from_lists(&args.stats, &args.skipstats)?.resolve()?;

    let tls = match &args.ssl_ca {
        Some(path) if !path.is_file() => {
            return Err(ConfigError::Tls(format!(
                "CA certificate {} is not a readable file",
                path.display()
            )));
        }
        Some(path) => TlsConfig {
            enabled: true,
            ca_certificate: Some(path.clone()),
        },
        None => TlsConfig {
            enabled: args.ssl,
            ca_certificate: None,
        },
    };

    Ok(ExporterConfig {
        connection: ConnectSettings {
            servers,
            port: args.port,
            credentials: credentials(args)?,
            tls,
            request_timeout: seconds(args.request_timeout),
        },
        categories,
        interval: args.delta,
        min_gather_interval: Duration::from_millis(args.min_gather_interval_ms),
        cycle_timeout: seconds(args.cycle_timeout),
    })
}

/// Accepts `host`, `host:port`, `[v6addr]` and `[v6addr]:port`.
fn check_server(server: &str) -> Result<(), ConfigError> {
    let invalid = |why: &str| Err(ConfigError::InvalidServer(format!("'{}': {}", server, why)));
    let port = match server.strip_prefix('[') {
        Some(rest) => match rest.split_once(']') {
            Some((addr, _)) if addr.is_empty() => return invalid("empty address"),
            Some((_, "")) => None,
            Some((_, tail)) => match tail.strip_prefix(':') {
                Some(port) => Some(port),
                None => return invalid("expected ':' after ']'"),
            },
            None => return invalid("missing ']'"),
        },
        None => match server.split_once(':') {
            Some((_, port)) if port.contains(':') => {
                return invalid("IPv6 addresses must be written as [addr] or [addr]:port");
            }
            Some(("", _)) => return invalid("empty host"),
            Some((_, port)) => Some(port),
            None => None,
        },
    };
    match port.map(str::parse::<u16>) {
        Some(Err(_)) => invalid("port is not a number between 0 and 65535"),
        _ => Ok(()),
    }
}

/// `0` means no limit.
fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn credentials(args: &Args) -> Result<Option<Credentials>, ConfigError> {
    if let Some(path) = &args.credentials {
        if args.user.is_some() || args.password.is_some() {
            return Err(ConfigError::Credentials(
                "--credentials can't be combined with --user/--password".to_string(),
            ));
        }
        return read_credentials_file(path).map(Some);
    }
    match (&args.user, &args.password) {
        (Some(username), password) => Ok(Some(Credentials {
            username: username.clone(),
            password: password.clone().unwrap_or_default(),
        })),
        (None, Some(_)) => Err(ConfigError::Credentials(
            "--password given without --user".to_string(),
        )),
        (None, None) => Ok(None),
    }
}

/// Reads a properties-style file with `username` and `password` keys.
fn read_credentials_file(path: &Path) -> Result<Credentials, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Credentials(format!("{}: {}", path.display(), e)))?;

    let mut username = None;
    let mut password = None;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once(['=', ':']) else {
            continue;
        };
        match key.trim() {
            "username" => username = Some(value.trim().to_string()),
            "password" => password = Some(value.trim().to_string()),
            _ => {}
        }
    }

    match username {
        Some(username) if !username.is_empty() => Ok(Credentials {
            username,
            password: password.unwrap_or_default(),
        }),
        _ => Err(ConfigError::Credentials(format!(
            "{}: no username",
            path.display()
        ))),
    }
}
