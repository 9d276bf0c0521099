//! Scripted in-memory client for testing the engine without a cluster.
//!
//! `MockClient` answers `@Statistics` calls from a per-selector script and
//! records what the engine asked for. Clones share the same script, so a test
//! can keep one handle and change behavior between gather cycles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::{
    ClientError, ColumnType, ProcedureParam, ProcedureResponse, ResponseCallback, StatsClient,
    StatsConnection, StatsTable, Value, status,
};
use crate::category::StatsCategory;
use crate::config::ConnectSettings;
use crate::mapper::ValueKind;

/// What the mock does with a call for one selector.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Invoke the callback with this response.
    Respond(ProcedureResponse),
    /// Invoke the callback with a transport error.
    Fail(ClientError),
    /// Refuse the call: `call_procedure` returns `Err(Dispatch)`.
    RejectDispatch,
    /// Keep the callback until the connection is closed.
    Hang,
    /// Accept the call and drop the callback without running it.
    Drop,
}

#[derive(Default)]
struct MockState {
    behaviors: HashMap<String, MockBehavior>,
    connect_failures: usize,
    connects: usize,
    closes: usize,
    calls: Vec<(String, Vec<ProcedureParam>)>,
    hung: Vec<ResponseCallback>,
}

/// Scripted client. See the module docs.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Creates a client with an empty script.
    ///
    /// Unscripted selectors get a `GRACEFUL_FAILURE` response, the same as a
    /// server that does not know the selector.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the behavior for one category.
    pub fn on(&self, category: StatsCategory, behavior: MockBehavior) -> &Self {
        self.state()
            .behaviors
            .insert(category.selector().to_string(), behavior);
        self
    }

    /// Answers `category` with a successful response holding `table`.
    pub fn respond(&self, category: StatsCategory, table: StatsTable) -> &Self {
        self.on(
            category,
            MockBehavior::Respond(ProcedureResponse::success(vec![table])),
        )
    }

    /// Makes the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: usize) -> &Self {
        self.state().connect_failures = n;
        self
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    /// Number of connections closed.
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    /// Every accepted or rejected call, in dispatch order.
    pub fn calls(&self) -> Vec<(String, Vec<ProcedureParam>)> {
        self.state().calls.clone()
    }

    /// A client that answers every category with one plausible row
    /// from host `h1`.
    pub fn healthy_cluster() -> Self {
        let client = Self::new();
        for category in StatsCategory::ALL {
            client.respond(category, sample_table(category, "h1", 1));
        }
        client
    }
}

/// One-row table matching `category`'s schema. Every label column holds
/// `host` (for `HOSTNAME`) or `"0"`; integer metrics hold `value`, float
/// metrics hold `value / 4`.
pub fn sample_table(category: StatsCategory, host: &str, value: i64) -> StatsTable {
    let spec = category.spec();
    let mut columns: Vec<(&str, ColumnType)> = vec![("TIMESTAMP", ColumnType::BigInt)];
    let mut row = vec![Value::Integer(1_600_000_000_000)];

    for label in spec.labels {
        let text = if label.column == "HOSTNAME" { host } else { "0" };
        columns.push((label.column, ColumnType::String));
        row.push(Value::String(text.to_string()));
    }
    for metric in spec.metrics {
        match metric.kind {
            ValueKind::Float => {
                columns.push((metric.column, ColumnType::Float));
                row.push(Value::Float(value as f64 / 4.0));
            }
            ValueKind::Integer => {
                columns.push((metric.column, ColumnType::BigInt));
                row.push(Value::Integer(value));
            }
            ValueKind::Timestamp => {
                columns.push((metric.column, ColumnType::Timestamp));
                row.push(Value::Integer(value));
            }
        }
    }

    StatsTable::new(&columns).with_row(row)
}

impl StatsClient for MockClient {
    type Connection = MockConnection;

    fn connect(&self, settings: &ConnectSettings) -> Result<MockConnection, ClientError> {
        let mut state = self.state();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(ClientError::Connect {
                server: settings.server_list(),
                message: "connection refused".to_string(),
            });
        }
        state.connects += 1;
        Ok(MockConnection {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
            outstanding: Arc::new((Mutex::new(0), Condvar::new())),
        })
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    closed: AtomicBool,
    outstanding: Arc<(Mutex<usize>, Condvar)>,
}

impl MockConnection {
    fn deliver(&self, callback: ResponseCallback, result: Result<ProcedureResponse, ClientError>) {
        let outstanding = Arc::clone(&self.outstanding);
        *outstanding.0.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        thread::spawn(move || {
            callback(result);
            let (count, idle) = &*outstanding;
            let mut n = count.lock().unwrap_or_else(PoisonError::into_inner);
            *n -= 1;
            idle.notify_all();
        });
    }
}

impl StatsConnection for MockConnection {
    fn call_procedure(
        &self,
        procedure: &str,
        params: Vec<ProcedureParam>,
        callback: ResponseCallback,
    ) -> Result<(), ClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        let selector = match params.first() {
            Some(ProcedureParam::String(s)) => s.clone(),
            _ => procedure.to_string(),
        };

        let behavior = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.calls.push((selector.clone(), params));
            state.behaviors.get(&selector).cloned()
        };

        match behavior {
            Some(MockBehavior::Respond(response)) => self.deliver(callback, Ok(response)),
            Some(MockBehavior::Fail(error)) => self.deliver(callback, Err(error)),
            Some(MockBehavior::RejectDispatch) => {
                return Err(ClientError::Dispatch(format!("{} rejected", selector)));
            }
            Some(MockBehavior::Hang) => self
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .hung
                .push(callback),
            Some(MockBehavior::Drop) => drop(callback),
            None => self.deliver(
                callback,
                Ok(ProcedureResponse::failure(
                    status::GRACEFUL_FAILURE,
                    format!("Invalid statistic selector {}", selector),
                )),
            ),
        }
        Ok(())
    }

    fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (count, idle) = &*self.outstanding;
        let mut n = count.lock().unwrap_or_else(PoisonError::into_inner);
        while *n > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            n = idle
                .wait_timeout(n, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let hung = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.closes += 1;
            std::mem::take(&mut state.hung)
        };
        // Dropped outside the lock: a callback's drop may report back to the caller.
        drop(hung);
    }
}
