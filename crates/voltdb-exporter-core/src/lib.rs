//! voltdb-exporter-core: metrics-gathering engine for the VoltDB Prometheus exporter.
//!
//! Provides:
//! - `client`: database client abstraction, VoltDB JSON/HTTP client, scripted mock
//! - `category`: the closed set of `@Statistics` selectors the exporter understands
//! - `mapper`: per-category column → metric tables and result-set decoding
//! - `registry`: gauge store backed by a private `prometheus::Registry`
//! - `coordinator`: one gather cycle: connect, fan out, wait, decide on the connection
//! - `gate`: scrape throttling and single-flighting in front of the coordinator
//! - `config`: validated configuration consumed by the engine

pub mod category;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod gate;
pub mod mapper;
pub mod registry;

pub use category::StatsCategory;
pub use config::ExporterConfig;
pub use coordinator::{CycleReport, GatherCoordinator, GatherOutcome, GatherPhase};
pub use gate::{ScrapeError, ScrapeGate, ScrapeResponse, Scraper};
pub use registry::MetricRegistry;

/// Crate version, reported in the startup log and `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
