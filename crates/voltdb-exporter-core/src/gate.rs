//! Scrape throttling.
//!
//! Prometheus (and people with curl) can scrape far more often than VoltDB
//! should be polled. The gate runs at most one gather cycle per
//! `min_interval` and serializes concurrent scrapes behind one mutex, so a
//! burst of requests costs a single cycle.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::client::StatsClient;
use crate::coordinator::{GatherCoordinator, GatherOutcome};
use crate::registry::{MetricRegistry, RegistryError};

/// Error type for scrape responses.
#[derive(Debug)]
pub enum ScrapeError {
    /// The last cycle failed and no value has ever been recorded.
    UpstreamUnavailable,
    /// Exposition encoding failed.
    Encode(RegistryError),
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::UpstreamUnavailable => write!(f, "VoltDB statistics unavailable"),
            ScrapeError::Encode(e) => write!(f, "failed to encode metrics: {}", e),
        }
    }
}

impl std::error::Error for ScrapeError {}

#[derive(Debug)]
pub struct ScrapeResponse {
    pub outcome: GatherOutcome,
    /// `false` when the previous outcome was replayed.
    pub cycle_ran: bool,
    pub body: Result<String, ScrapeError>,
}

/// Anything that can answer a scrape. Implemented by [`ScrapeGate`]; the web
/// layer only sees this trait.
pub trait Scraper: Send + Sync {
    /// Blocks for up to one gather cycle.
    fn handle_scrape(&self) -> ScrapeResponse;

    /// Releases the database connection.
    fn shutdown(&self);
}

struct GateState<C: StatsClient> {
    coordinator: GatherCoordinator<C>,
    last_cycle: Option<(Instant, GatherOutcome)>,
}

pub struct ScrapeGate<C: StatsClient> {
    inner: Mutex<GateState<C>>,
    registry: Arc<MetricRegistry>,
    min_interval: Duration,
}

impl<C: StatsClient> ScrapeGate<C> {
    pub fn new(coordinator: GatherCoordinator<C>, min_interval: Duration) -> Self {
        let registry = Arc::clone(coordinator.registry());
        Self {
            inner: Mutex::new(GateState {
                coordinator,
                last_cycle: None,
            }),
            registry,
            min_interval,
        }
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }
}

impl<C: StatsClient> Scraper for ScrapeGate<C> {
    fn handle_scrape(&self) -> ScrapeResponse {
        let (outcome, cycle_ran) = {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            match state.last_cycle {
                Some((ended, outcome)) if ended.elapsed() < self.min_interval => {
                    debug!(
                        since_ms = ended.elapsed().as_millis() as u64,
                        "inside minimum gather interval, replaying last outcome"
                    );
                    (outcome, false)
                }
                _ => {
                    let report = state.coordinator.gather();
                    state.last_cycle = Some((Instant::now(), report.outcome));
                    (report.outcome, true)
                }
            }
        };

        let body = if outcome == GatherOutcome::Failed && !self.registry.has_values() {
            Err(ScrapeError::UpstreamUnavailable)
        } else {
            self.registry.encode().map_err(ScrapeError::Encode)
        };

        ScrapeResponse {
            outcome,
            cycle_ran,
            body,
        }
    }

    fn shutdown(&self) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.coordinator.disconnect();
        info!("scrape gate shut down");
    }
}
