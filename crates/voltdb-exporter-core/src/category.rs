//! Statistics categories (`@Statistics` selectors) supported by the exporter.
//!
//! The names are the ones VoltDB uses for its `StatsSelector`, so operators can
//! pass the same spelling to `--stats` / `--skipstats` that they use in sqlcmd.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatsCategory {
    CommandLog,
    Cpu,
    Export,
    Gc,
    Idletime,
    Index,
    /// May cause significant overhead on busy clusters.
    Initiator,
    IoStats,
    Latency,
    LiveClients,
    Memory,
    Procedure,
    Queue,
    QueuePriority,
    Table,
}

impl StatsCategory {
    pub const ALL: [StatsCategory; 15] = [
        StatsCategory::CommandLog,
        StatsCategory::Cpu,
        StatsCategory::Export,
        StatsCategory::Gc,
        StatsCategory::Idletime,
        StatsCategory::Index,
        StatsCategory::Initiator,
        StatsCategory::IoStats,
        StatsCategory::Latency,
        StatsCategory::LiveClients,
        StatsCategory::Memory,
        StatsCategory::Procedure,
        StatsCategory::Queue,
        StatsCategory::QueuePriority,
        StatsCategory::Table,
    ];

    /// Selector string passed as the first `@Statistics` parameter.
    pub fn selector(self) -> &'static str {
        match self {
            StatsCategory::CommandLog => "COMMANDLOG",
            StatsCategory::Cpu => "CPU",
            StatsCategory::Export => "EXPORT",
            StatsCategory::Gc => "GC",
            StatsCategory::Idletime => "IDLETIME",
            StatsCategory::Index => "INDEX",
            StatsCategory::Initiator => "INITIATOR",
            StatsCategory::IoStats => "IOSTATS",
            StatsCategory::Latency => "LATENCY",
            StatsCategory::LiveClients => "LIVECLIENTS",
            StatsCategory::Memory => "MEMORY",
            StatsCategory::Procedure => "PROCEDURE",
            StatsCategory::Queue => "QUEUE",
            StatsCategory::QueuePriority => "QUEUEPRIORITY",
            StatsCategory::Table => "TABLE",
        }
    }
}

impl fmt::Display for StatsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for StatsCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        StatsCategory::ALL
            .into_iter()
            .find(|c| c.selector().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownCategory(name.to_string()))
    }
}
