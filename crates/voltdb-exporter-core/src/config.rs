//! Validated engine configuration.
//!
//! The binary parses command-line syntax, credentials files and environment
//! variables; this module only holds the result and the category-selection
//! rules that the engine depends on.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::category::StatsCategory;

/// Default VoltDB HTTP/JSON interface port.
pub const DEFAULT_VOLTDB_PORT: u16 = 8080;

/// Minimum time between two gather cycles triggered by scrapes.
pub const DEFAULT_MIN_GATHER_INTERVAL: Duration = Duration::from_millis(1500);

/// Upper bound on one gather cycle's wait for outstanding categories.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for configuration problems.
#[derive(Debug)]
pub enum ConfigError {
    /// Both an inclusion and an exclusion list were given.
    ConflictingSelection,
    /// A category name is not a supported selector.
    UnknownCategory(String),
    /// The selection leaves nothing to poll.
    EmptySelection,
    /// No VoltDB server was given.
    NoServers,
    /// A server entry is not `host`, `host:port` or `[v6addr]:port`.
    InvalidServer(String),
    /// Credentials could not be loaded or are incomplete.
    Credentials(String),
    /// TLS material is missing or unreadable.
    Tls(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConflictingSelection => {
                write!(f, "can't set both --stats and --skipstats")
            }
            ConfigError::UnknownCategory(name) => {
                let supported: Vec<&str> = StatsCategory::ALL.iter().map(|c| c.selector()).collect();
                write!(
                    f,
                    "unsupported statistics '{}' (supported: {})",
                    name,
                    supported.join(", ")
                )
            }
            ConfigError::EmptySelection => write!(f, "no statistics to poll"),
            ConfigError::NoServers => write!(f, "at least one VoltDB server is required"),
            ConfigError::InvalidServer(msg) => write!(f, "invalid server {}", msg),
            ConfigError::Credentials(msg) => write!(f, "credentials: {}", msg),
            ConfigError::Tls(msg) => write!(f, "TLS: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Username and password for the VoltDB connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// PEM bundle with extra trusted roots; system roots are used otherwise.
    pub ca_certificate: Option<PathBuf>,
}

/// Everything a client needs to open a connection.
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub servers: Vec<String>,
    pub port: u16,
    pub credentials: Option<Credentials>,
    pub tls: TlsConfig,
    /// Per-request transport timeout, also the budget for the connect pings.
    /// The coordinator fills in its cycle timeout when this is `None`.
    pub request_timeout: Option<Duration>,
}

impl ConnectSettings {
    /// Comma-joined server list, for log lines and the root page.
    pub fn server_list(&self) -> String {
        self.servers.join(",")
    }
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            servers: vec!["localhost".to_string()],
            port: DEFAULT_VOLTDB_PORT,
            credentials: None,
            tls: TlsConfig::default(),
            request_timeout: None,
        }
    }
}

/// Operator choice of which categories to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelection {
    All,
    Only(Vec<String>),
    Skip(Vec<String>),
}

impl CategorySelection {
    /// Builds a selection from the (possibly empty) include and exclude lists.
    pub fn from_lists(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(ConfigError::ConflictingSelection),
            (false, true) => Ok(CategorySelection::Only(include.to_vec())),
            (true, false) => Ok(CategorySelection::Skip(exclude.to_vec())),
            (true, true) => Ok(CategorySelection::All),
        }
    }

    /// Resolves names to categories. Unknown names and an empty result are errors.
    pub fn resolve(&self) -> Result<BTreeSet<StatsCategory>, ConfigError> {
        let selected: BTreeSet<StatsCategory> = match self {
            CategorySelection::All => StatsCategory::ALL.into_iter().collect(),
            CategorySelection::Only(names) => parse_names(names)?,
            CategorySelection::Skip(names) => {
                let skipped = parse_names(names)?;
                StatsCategory::ALL
                    .into_iter()
                    .filter(|c| !skipped.contains(c))
                    .collect()
            }
        };
        if selected.is_empty() {
            return Err(ConfigError::EmptySelection);
        }
        Ok(selected)
    }
}

fn parse_names(names: &[String]) -> Result<BTreeSet<StatsCategory>, ConfigError> {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.parse::<StatsCategory>())
        .collect()
}

/// Complete, already-validated engine configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub connection: ConnectSettings,
    pub categories: BTreeSet<StatsCategory>,
    /// `@Statistics` interval flag: `true` reports deltas since the last poll.
    pub interval: bool,
    pub min_gather_interval: Duration,
    /// `None` lets a cycle wait forever for a stalled category.
    pub cycle_timeout: Option<Duration>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            connection: ConnectSettings::default(),
            categories: StatsCategory::ALL.into_iter().collect(),
            interval: false,
            min_gather_interval: DEFAULT_MIN_GATHER_INTERVAL,
            cycle_timeout: Some(DEFAULT_CYCLE_TIMEOUT),
        }
    }
}
