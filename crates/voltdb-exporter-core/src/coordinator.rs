//! Gather cycle: one `@Statistics` call per selected category, issued
//! concurrently, then a barrier until every category has reported back.
//!
//! ```text
//!   Idle ──▶ Connecting ──▶ Dispatching ──▶ Awaiting ──▶ Done(outcome)
//!               │                                           ▲
//!               └──────────── connect failed ───────────────┘
//! ```
//!
//! Each dispatched call carries a [`Completion`] that reports exactly once:
//! either from the response callback, or, if the client drops the callback
//! without running it, as `Abandoned`. The coordinator counts arrivals on an
//! mpsc channel, so the barrier cannot hang on a lost callback. With a cycle
//! timeout configured it cannot hang on a stalled server either.
//!
//! Transport-level failures (dispatch errors, lost or abandoned calls,
//! timeouts) discard the connection; the next cycle reconnects. Server
//! errors and decode errors leave it in place.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::category::StatsCategory;
use crate::client::{
    ClientError, ProcedureParam, ProcedureResponse, ResponseCallback, STATISTICS_PROCEDURE,
    StatsClient, StatsConnection,
};
use crate::config::{ConnectSettings, ExporterConfig};
use crate::mapper::StatsMapper;
use crate::registry::{MetricRegistry, RegistryError};

/// How long `disconnect` waits for outstanding calls before closing.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherOutcome {
    /// Every category reported.
    Success,
    /// Some categories failed but at least one value was recorded.
    Degraded,
    /// Nothing was recorded this cycle.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherPhase {
    Idle,
    Connecting,
    Dispatching,
    Awaiting,
    Done(GatherOutcome),
}

/// Summary of one gather cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: GatherOutcome,
    /// Values written to the registry this cycle.
    pub values_reported: usize,
    /// Categories whose call was accepted by the client.
    pub dispatched: usize,
    /// Failed categories with a human-readable reason.
    pub failed: Vec<(StatsCategory, String)>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn is_failed(&self, category: StatsCategory) -> bool {
        self.failed.iter().any(|(c, _)| *c == category)
    }
}

#[derive(Debug)]
enum CategoryResult {
    Decoded(usize),
    DecodeFailed(String),
    ServerFailed(String),
    TransportFailed(String),
    DispatchFailed(String),
    Abandoned,
    TimedOut,
}

impl CategoryResult {
    /// Whether this result means the connection can no longer be trusted.
    fn taints_connection(&self) -> bool {
        matches!(
            self,
            CategoryResult::TransportFailed(_)
                | CategoryResult::DispatchFailed(_)
                | CategoryResult::Abandoned
                | CategoryResult::TimedOut
        )
    }

    fn reason(&self) -> String {
        match self {
            CategoryResult::Decoded(_) => String::new(),
            CategoryResult::DecodeFailed(msg) => format!("decode failed: {}", msg),
            CategoryResult::ServerFailed(msg) => format!("server error: {}", msg),
            CategoryResult::TransportFailed(msg) => msg.clone(),
            CategoryResult::DispatchFailed(msg) => msg.clone(),
            CategoryResult::Abandoned => "callback dropped without a response".to_string(),
            CategoryResult::TimedOut => "no response before cycle timeout".to_string(),
        }
    }
}

struct Arrival {
    category: StatsCategory,
    result: CategoryResult,
}

/// Reports one category's result exactly once, on completion or on drop.
struct Completion {
    category: StatsCategory,
    fired: Arc<AtomicBool>,
    tx: mpsc::Sender<Arrival>,
}

impl Completion {
    fn complete(self, result: CategoryResult) {
        self.send(result);
    }

    fn send(&self, result: CategoryResult) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            // Receiver is gone once the cycle has given up on us.
            let _ = self.tx.send(Arrival {
                category: self.category,
                result,
            });
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.send(CategoryResult::Abandoned);
    }
}

fn classify(
    mapper: &StatsMapper,
    registry: &MetricRegistry,
    result: Result<ProcedureResponse, ClientError>,
) -> CategoryResult {
    match result {
        Err(e) => CategoryResult::TransportFailed(e.to_string()),
        Ok(response) if response.is_connection_failure() => {
            CategoryResult::TransportFailed(response.describe())
        }
        Ok(response) if !response.is_success() => CategoryResult::ServerFailed(response.describe()),
        Ok(response) => match mapper.decode(&response.tables, registry) {
            Ok(n) => CategoryResult::Decoded(n),
            Err(e) => CategoryResult::DecodeFailed(e.to_string()),
        },
    }
}

#[derive(Default)]
struct Tally {
    values: usize,
    failed: Vec<(StatsCategory, String)>,
    tainted: bool,
}

impl Tally {
    fn record(&mut self, category: StatsCategory, result: CategoryResult) {
        if let CategoryResult::Decoded(n) = result {
            self.values += n;
            return;
        }
        let reason = result.reason();
        warn!(category = %category, reason = %reason, "statistics request failed");
        self.tainted |= result.taints_connection();
        self.failed.push((category, reason));
    }
}

/// Runs gather cycles against one cluster and owns its connection.
pub struct GatherCoordinator<C: StatsClient> {
    client: C,
    settings: ConnectSettings,
    mappers: Vec<Arc<StatsMapper>>,
    registry: Arc<MetricRegistry>,
    connection: Option<C::Connection>,
    interval: bool,
    cycle_timeout: Option<Duration>,
    phase: GatherPhase,
}

impl<C: StatsClient> GatherCoordinator<C> {
    /// Builds a coordinator and registers every selected category's metrics.
    pub fn new(
        client: C,
        config: &ExporterConfig,
        registry: Arc<MetricRegistry>,
    ) -> Result<Self, RegistryError> {
        let mappers = config
            .categories
            .iter()
            .map(|&category| Arc::new(StatsMapper::new(category)))
            .collect::<Vec<_>>();
        for mapper in &mappers {
            mapper.register(&registry)?;
        }
        let selected: Vec<&str> = config.categories.iter().map(|c| c.selector()).collect();
        info!(
            categories = %selected.join(","),
            metrics = registry.snapshot_names().len(),
            "statistics registered"
        );

        let mut settings = config.connection.clone();
        // Calls and pings must not outlive the cycle that issued them.
        if settings.request_timeout.is_none() {
            settings.request_timeout = config.cycle_timeout;
        }

        Ok(Self {
            client,
            settings,
            mappers,
            registry,
            connection: None,
            interval: config.interval,
            cycle_timeout: config.cycle_timeout,
            phase: GatherPhase::Idle,
        })
    }

    pub fn phase(&self) -> GatherPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn categories(&self) -> impl Iterator<Item = StatsCategory> + '_ {
        self.mappers.iter().map(|m| m.category())
    }

    /// Runs one full gather cycle. Never fails; problems are in the report.
    pub fn gather(&mut self) -> CycleReport {
        let started = Instant::now();

        if self.connection.is_none() {
            self.phase = GatherPhase::Connecting;
            match self.client.connect(&self.settings) {
                Ok(connection) => self.connection = Some(connection),
                Err(e) => {
                    warn!(servers = %self.settings.server_list(), error = %e, "unable to connect");
                    let reason = e.to_string();
                    let failed = self.categories().map(|c| (c, reason.clone())).collect();
                    let tally = Tally {
                        failed,
                        ..Tally::default()
                    };
                    return self.finish(started, 0, tally);
                }
            }
        }
        let Some(connection) = self.connection.as_ref() else {
            return self.finish(started, 0, Tally::default());
        };

        self.phase = GatherPhase::Dispatching;
        let (tx, rx) = mpsc::channel::<Arrival>();
        let mut pending = BTreeSet::new();
        let mut dispatch_errors: HashMap<StatsCategory, ClientError> = HashMap::new();
        let mut tally = Tally::default();
        let mut dispatched = 0;

        for mapper in &self.mappers {
            let category = mapper.category();
            let fired = Arc::new(AtomicBool::new(false));
            let completion = Completion {
                category,
                fired: Arc::clone(&fired),
                tx: tx.clone(),
            };
            let cb_mapper = Arc::clone(mapper);
            let cb_registry = Arc::clone(&self.registry);
            let callback: ResponseCallback = Box::new(move |result| {
                completion.complete(classify(&cb_mapper, &cb_registry, result));
            });

            let params = vec![
                ProcedureParam::String(category.selector().to_string()),
                ProcedureParam::Integer(i64::from(self.interval)),
            ];
            match connection.call_procedure(STATISTICS_PROCEDURE, params, callback) {
                Ok(()) => {
                    dispatched += 1;
                    pending.insert(category);
                }
                Err(e) if !fired.swap(true, Ordering::AcqRel) => {
                    // The client still holds the callback; it can no longer report.
                    tally.record(category, CategoryResult::DispatchFailed(e.to_string()));
                }
                Err(e) => {
                    // The dropped callback already reported `Abandoned`.
                    dispatch_errors.insert(category, e);
                    pending.insert(category);
                }
            }
        }
        drop(tx);
        debug!(dispatched, pending = pending.len(), "statistics requests dispatched");

        self.phase = GatherPhase::Awaiting;
        let deadline = self.cycle_timeout.map(|t| started + t);
        while !pending.is_empty() {
            let received = match deadline {
                Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            let arrival = match received {
                Ok(arrival) => arrival,
                Err(RecvTimeoutError::Timeout) => {
                    for category in std::mem::take(&mut pending) {
                        tally.record(category, CategoryResult::TimedOut);
                    }
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for category in std::mem::take(&mut pending) {
                        tally.record(category, CategoryResult::Abandoned);
                    }
                    break;
                }
            };
            if !pending.remove(&arrival.category) {
                continue;
            }
            let result = match (arrival.result, dispatch_errors.remove(&arrival.category)) {
                (CategoryResult::Abandoned, Some(e)) => CategoryResult::DispatchFailed(e.to_string()),
                (result, _) => result,
            };
            tally.record(arrival.category, result);
        }

        self.finish(started, dispatched, tally)
    }

    fn finish(&mut self, started: Instant, dispatched: usize, tally: Tally) -> CycleReport {
        if tally.tainted {
            if let Some(connection) = self.connection.take() {
                warn!("discarding VoltDB connection after transport failure");
                connection.close();
            }
        }

        let outcome = if tally.failed.is_empty() {
            GatherOutcome::Success
        } else if tally.values > 0 {
            GatherOutcome::Degraded
        } else {
            GatherOutcome::Failed
        };
        self.phase = GatherPhase::Done(outcome);

        let report = CycleReport {
            outcome,
            values_reported: tally.values,
            dispatched,
            failed: tally.failed,
            elapsed: started.elapsed(),
        };
        debug!(
            outcome = ?report.outcome,
            values = report.values_reported,
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "gather cycle finished"
        );
        report
    }

    /// Waits for outstanding calls (bounded by [`DRAIN_TIMEOUT`]) and closes
    /// the connection.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            if !connection.drain(DRAIN_TIMEOUT) {
                warn!("closing VoltDB connection with calls still outstanding");
            }
            connection.close();
            info!("disconnected from VoltDB");
        }
        self.phase = GatherPhase::Idle;
    }
}

impl<C: StatsClient> Drop for GatherCoordinator<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
