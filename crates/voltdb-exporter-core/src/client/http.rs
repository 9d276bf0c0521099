//! VoltDB HTTP/JSON interface client.
//!
//! Procedures are invoked with a form POST to `/api/1.0/` on one of the
//! configured servers (round-robin). Each call runs on its own short-lived
//! thread so `call_procedure` never blocks the coordinator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    ClientError, ColumnType, ProcedureParam, ProcedureResponse, ResponseCallback, StatsClient,
    StatsConnection, StatsTable, Value,
};
use crate::config::{ConnectSettings, Credentials};

const API_PATH: &str = "/api/1.0/";
const PING_PROCEDURE: &str = "@Ping";

/// Calls allowed in flight before `call_procedure` refuses new ones.
pub const DEFAULT_MAX_OUTSTANDING: usize = 64;

#[derive(Debug, Clone)]
pub struct HttpClient {
    max_outstanding: usize,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            max_outstanding: DEFAULT_MAX_OUTSTANDING,
        }
    }

    pub fn with_max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.max_outstanding = max_outstanding;
        self
    }
}

impl StatsClient for HttpClient {
    type Connection = HttpConnection;

    fn connect(&self, settings: &ConnectSettings) -> Result<HttpConnection, ClientError> {
        let http = build_http_client(settings)?;
        let scheme = if settings.tls.enabled { "https" } else { "http" };
        let endpoints: Vec<String> = settings
            .servers
            .iter()
            .map(|server| endpoint_url(scheme, server, settings.port))
            .collect();

        let shared = Arc::new(Shared {
            http,
            endpoints,
            credentials: settings.credentials.clone(),
            next: AtomicUsize::new(0),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
            closed: AtomicBool::new(false),
            max_outstanding: self.max_outstanding,
        });

        // All pings share one request timeout so a silent server can't stall
        // the connect phase once per entry.
        let deadline = settings.request_timeout.map(|t| Instant::now() + t);
        for (server, endpoint) in settings.servers.iter().zip(&shared.endpoints) {
            info!(server = %server, port = settings.port, "connecting to VoltDB");
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining == Some(Duration::ZERO) {
                return Err(ClientError::Connect {
                    server: server.clone(),
                    message: "timed out before ping".to_string(),
                });
            }
            let response = shared
                .invoke(endpoint, PING_PROCEDURE, &[], remaining)
                .map_err(|e| ClientError::Connect {
                    server: server.clone(),
                    message: e.to_string(),
                })?;
            if !response.is_success() {
                return Err(ClientError::Connect {
                    server: server.clone(),
                    message: response.describe(),
                });
            }
            info!(server = %server, "connected to VoltDB");
        }

        Ok(HttpConnection { shared })
    }
}

fn build_http_client(settings: &ConnectSettings) -> Result<Client, ClientError> {
    // VoltDB sits next to the exporter; system proxies don't apply.
    let mut builder = Client::builder()
        .no_proxy()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.request_timeout);
    if let Some(path) = &settings.tls.ca_certificate {
        let pem = std::fs::read(path)
            .map_err(|e| ClientError::Tls(format!("{}: {}", path.display(), e)))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| ClientError::Tls(format!("{}: {}", path.display(), e)))?;
        builder = builder.add_root_certificate(cert);
    }
    builder
        .build()
        .map_err(|e| ClientError::Tls(e.to_string()))
}

/// `server` may carry its own port (`host:port`); otherwise `port` is used.
fn endpoint_url(scheme: &str, server: &str, port: u16) -> String {
    let has_port = match server.strip_prefix('[') {
        Some(bracketed) => bracketed.contains("]:"),
        None => server.contains(':'),
    };
    if has_port {
        format!("{}://{}{}", scheme, server, API_PATH)
    } else {
        format!("{}://{}:{}{}", scheme, server, port, API_PATH)
    }
}

struct Shared {
    http: Client,
    endpoints: Vec<String>,
    credentials: Option<Credentials>,
    next: AtomicUsize,
    outstanding: Mutex<usize>,
    idle: Condvar,
    closed: AtomicBool,
    max_outstanding: usize,
}

impl Shared {
    fn next_endpoint(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[i]
    }

    fn invoke(
        &self,
        endpoint: &str,
        procedure: &str,
        params: &[ProcedureParam],
        timeout: Option<Duration>,
    ) -> Result<ProcedureResponse, ClientError> {
        let parameters =
            serde_json::to_string(params).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let mut form = vec![("Procedure", procedure.to_string()), ("Parameters", parameters)];
        if let Some(creds) = &self.credentials {
            form.push(("User", creds.username.clone()));
            form.push(("Password", creds.password.clone()));
        }

        let mut request = self.http.post(endpoint).form(&form);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("{} returned HTTP {}", endpoint, status)));
        }
        let body: ApiResponse = response
            .json()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        body.into_response()
    }
}

/// Decrements the outstanding count when a call finishes, or when its
/// thread could not be started.
struct OutstandingGuard(Arc<Shared>);

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        let mut n = self
            .0
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *n = n.saturating_sub(1);
        if *n == 0 {
            self.0.idle.notify_all();
        }
    }
}

pub struct HttpConnection {
    shared: Arc<Shared>,
}

impl StatsConnection for HttpConnection {
    fn call_procedure(
        &self,
        procedure: &str,
        params: Vec<ProcedureParam>,
        callback: ResponseCallback,
    ) -> Result<(), ClientError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        {
            let mut n = self
                .shared
                .outstanding
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *n >= self.shared.max_outstanding {
                return Err(ClientError::Dispatch(format!(
                    "{} requests already outstanding",
                    *n
                )));
            }
            *n += 1;
        }

        let guard = OutstandingGuard(Arc::clone(&self.shared));
        let endpoint = self.shared.next_endpoint().to_string();
        let procedure = procedure.to_string();
        debug!(procedure = %procedure, endpoint = %endpoint, "dispatching call");

        thread::Builder::new()
            .name("voltdb-call".into())
            .spawn(move || {
                let result = guard.0.invoke(&endpoint, &procedure, &params, None);
                if let Err(e) = &result {
                    debug!(procedure = %procedure, error = %e, "call failed");
                }
                callback(result);
                drop(guard);
            })
            .map(|_| ())
            .map_err(|e| ClientError::Dispatch(e.to_string()))
    }

    fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut n = self
            .shared
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *n > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(outstanding = *n, "drain timed out");
                return false;
            }
            n = self
                .shared
                .idle
                .wait_timeout(n, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Refuses further calls. Calls already in flight end at the request
    /// timeout and release the client with their last reference.
    fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            info!("VoltDB connection closed");
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: i8,
    #[serde(default)]
    statusstring: Option<String>,
    #[serde(default)]
    results: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiTable {
    schema: Vec<ApiColumn>,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiColumn {
    name: String,
    #[serde(rename = "type")]
    column_type: i8,
}

impl ApiResponse {
    fn into_response(self) -> Result<ProcedureResponse, ClientError> {
        // Older servers send `results` as an array, newer ones as an object
        // keyed by result index.
        let raw_tables: Vec<serde_json::Value> = match self.results {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(tables)) => tables,
            Some(serde_json::Value::Object(map)) => {
                let mut keyed: Vec<(usize, serde_json::Value)> = map
                    .into_iter()
                    .map(|(k, v)| (k.parse().unwrap_or(usize::MAX), v))
                    .collect();
                keyed.sort_by_key(|(k, _)| *k);
                keyed.into_iter().map(|(_, v)| v).collect()
            }
            Some(other) => {
                return Err(ClientError::Protocol(format!(
                    "unexpected results field: {}",
                    other
                )));
            }
        };

        let tables = raw_tables
            .into_iter()
            .map(|raw| {
                serde_json::from_value::<ApiTable>(raw)
                    .map(ApiTable::into_table)
                    .map_err(|e| ClientError::Protocol(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProcedureResponse {
            status: self.status,
            status_string: self.statusstring,
            tables,
        })
    }
}

impl ApiTable {
    fn into_table(self) -> StatsTable {
        let columns: Vec<(String, ColumnType)> = self
            .schema
            .into_iter()
            .map(|c| (c.name, ColumnType::from_code(c.column_type)))
            .collect();
        let rows = self
            .data
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&columns)
                    .map(|(cell, (_, ty))| to_value(cell, *ty))
                    .collect()
            })
            .collect();
        StatsTable {
            columns: columns
                .into_iter()
                .map(|(name, column_type)| super::Column { name, column_type })
                .collect(),
            rows,
        }
    }
}

fn to_value(cell: serde_json::Value, ty: ColumnType) -> Value {
    use serde_json::Value as Json;
    match (cell, ty) {
        (Json::Null, _) => Value::Null,
        (
            Json::Number(n),
            ColumnType::TinyInt
            | ColumnType::SmallInt
            | ColumnType::Integer
            | ColumnType::BigInt
            | ColumnType::Timestamp,
        ) => match n.as_i64() {
            Some(v) => Value::Integer(v),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        (Json::Number(n), _) => match (n.as_i64(), ty) {
            (Some(v), ColumnType::Other(_)) => Value::Integer(v),
            _ => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        (Json::String(s), ColumnType::Decimal | ColumnType::Float) => match s.parse::<f64>() {
            Ok(v) => Value::Float(v),
            Err(_) => Value::String(s),
        },
        (Json::String(s), _) => Value::String(s),
        (other, _) => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ProcedureResponse {
        serde_json::from_str::<ApiResponse>(body)
            .unwrap()
            .into_response()
            .unwrap()
    }

    fn shared(max_outstanding: usize) -> Arc<Shared> {
        Arc::new(Shared {
            http: Client::new(),
            endpoints: vec!["http://127.0.0.1:9/api/1.0/".into()],
            credentials: None,
            next: AtomicUsize::new(0),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
            closed: AtomicBool::new(false),
            max_outstanding,
        })
    }

    #[test]
    fn parses_statistics_response() {
        let response = parse(
            r#"{"status":1,"appstatus":-128,"statusstring":null,"results":[
                {"status":-128,
                 "schema":[{"name":"TIMESTAMP","type":6},{"name":"HOSTNAME","type":9},
                           {"name":"SITE_ID","type":5},{"name":"PERCENT","type":8},
                           {"name":"AVG_WAIT","type":6}],
                 "data":[[1600000000000,"h1",3,0.25,2500],[1600000000000,"h2",4,null,10]]}]}"#,
        );

        assert!(response.is_success());
        let table = &response.tables[0];
        assert_eq!(table.columns[1].column_type, ColumnType::String);
        assert_eq!(table.rows[0][1], Value::String("h1".into()));
        assert_eq!(table.rows[0][2], Value::Integer(3));
        assert_eq!(table.rows[0][3], Value::Float(0.25));
        assert_eq!(table.rows[1][3], Value::Null);
    }

    #[test]
    fn parses_keyed_results_in_index_order() {
        let response = parse(
            r#"{"status":1,"results":{
                "1":{"schema":[{"name":"B","type":6}],"data":[[2]]},
                "0":{"schema":[{"name":"A","type":6}],"data":[[1]]}}}"#,
        );
        assert_eq!(response.tables.len(), 2);
        assert_eq!(response.tables[0].columns[0].name, "A");
        assert_eq!(response.tables[1].rows[0][0], Value::Integer(2));
    }

    #[test]
    fn parses_failure_status() {
        let response = parse(
            r#"{"status":-2,"statusstring":"Invalid statistic selector BOGUS","results":[]}"#,
        );
        assert!(!response.is_success());
        assert!(response.describe().contains("BOGUS"));
        assert!(response.tables.is_empty());
    }

    #[test]
    fn decimal_strings_become_floats() {
        assert_eq!(
            to_value(serde_json::json!("12.50"), ColumnType::Decimal),
            Value::Float(12.5)
        );
        assert_eq!(
            to_value(serde_json::json!(7), ColumnType::Float),
            Value::Float(7.0)
        );
    }

    #[test]
    fn endpoint_uses_default_port_unless_given() {
        assert_eq!(
            endpoint_url("http", "db1", 8080),
            "http://db1:8080/api/1.0/"
        );
        assert_eq!(
            endpoint_url("https", "db1:8443", 8080),
            "https://db1:8443/api/1.0/"
        );
        assert_eq!(
            endpoint_url("http", "[::1]", 8080),
            "http://[::1]:8080/api/1.0/"
        );
    }

    #[test]
    fn closed_connection_rejects_calls() {
        let conn = HttpConnection { shared: shared(4) };
        conn.close();
        let err = conn
            .call_procedure("@Statistics", vec![], Box::new(|_| {}))
            .unwrap_err();
        assert!(matches!(err, ClientError::Closed));
        assert!(conn.drain(Duration::from_millis(10)));
    }

    #[test]
    fn outstanding_cap_rejects_dispatch() {
        let conn = HttpConnection { shared: shared(0) };
        let err = conn
            .call_procedure("@Statistics", vec![], Box::new(|_| {}))
            .unwrap_err();
        assert!(matches!(err, ClientError::Dispatch(_)));
    }

    // Loopback VoltDB stand-in: answers `@Ping` with a fixed status and either
    // answers or holds `@Statistics` until the client hangs up.

    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;

    use crate::category::StatsCategory;
    use crate::config::ExporterConfig;
    use crate::coordinator::{GatherCoordinator, GatherOutcome};
    use crate::registry::MetricRegistry;

    const CPU_RESPONSE: &str = r#"{"status":1,"results":[{"schema":[
        {"name":"HOSTNAME","type":9},{"name":"PERCENT_USED","type":6}],
        "data":[["h1",35]]}]}"#;

    #[derive(Clone, Copy)]
    enum StatsReply {
        Respond,
        Hold,
    }

    struct Stub {
        server: String,
        requests: Arc<AtomicUsize>,
        held: Arc<AtomicUsize>,
    }

    fn stub(ping_status: i8, reply: StatsReply) -> Stub {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(AtomicUsize::new(0));
        let held = Arc::new(AtomicUsize::new(0));
        let (r, h) = (Arc::clone(&requests), Arc::clone(&held));
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let (r, h) = (Arc::clone(&r), Arc::clone(&h));
                thread::spawn(move || serve(stream, ping_status, reply, &r, &h));
            }
        });
        Stub {
            server,
            requests,
            held,
        }
    }

    fn serve(
        mut stream: TcpStream,
        ping_status: i8,
        reply: StatsReply,
        requests: &AtomicUsize,
        held: &AtomicUsize,
    ) {
        let Some(body) = read_request(&mut stream) else {
            return;
        };
        requests.fetch_add(1, Ordering::SeqCst);
        let json = if body.contains("Procedure=%40Ping") {
            format!(r#"{{"status":{ping_status},"statusstring":"ping refused","results":[]}}"#)
        } else {
            match reply {
                StatsReply::Respond => CPU_RESPONSE.to_string(),
                StatsReply::Hold => {
                    held.fetch_add(1, Ordering::SeqCst);
                    let mut buf = [0u8; 256];
                    while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
                    held.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
            }
        };
        let _ = write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            json.len(),
            json
        );
    }

    /// Returns the request body once headers and `Content-Length` bytes arrived.
    fn read_request(stream: &mut TcpStream) -> Option<String> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let start = end + 4;
                while data.len() < start + length {
                    let n = stream.read(&mut buf).ok().filter(|&n| n > 0)?;
                    data.extend_from_slice(&buf[..n]);
                }
                return Some(String::from_utf8_lossy(&data[start..start + length]).into_owned());
            }
            let n = stream.read(&mut buf).ok().filter(|&n| n > 0)?;
            data.extend_from_slice(&buf[..n]);
        }
    }

    /// Accepts connections and never answers.
    fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let mut open = Vec::new();
            for stream in listener.incoming().flatten() {
                open.push(stream);
            }
        });
        server
    }

    fn settings<S: AsRef<str>>(
        servers: &[S],
        request_timeout: Option<Duration>,
    ) -> ConnectSettings {
        ConnectSettings {
            servers: servers.iter().map(|s| s.as_ref().to_string()).collect(),
            request_timeout,
            ..ConnectSettings::default()
        }
    }

    fn wait_until(timeout: Duration, done: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        done()
    }

    #[test]
    fn connect_pings_every_server() {
        let (a, b) = (stub(1, StatsReply::Respond), stub(1, StatsReply::Respond));
        let timeout = Some(Duration::from_secs(5));

        HttpClient::new()
            .connect(&settings(&[&a.server, &b.server], timeout))
            .unwrap();

        assert_eq!(a.requests.load(Ordering::SeqCst), 1);
        assert_eq!(b.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_ping_names_the_server() {
        let (good, bad) = (stub(1, StatsReply::Respond), stub(-3, StatsReply::Respond));
        let timeout = Some(Duration::from_secs(5));

        let err = HttpClient::new()
            .connect(&settings(&[&good.server, &bad.server], timeout))
            .err()
            .unwrap();

        match err {
            ClientError::Connect { server, message } => {
                assert_eq!(server, bad.server);
                assert!(message.contains("ping refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreachable_server_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = HttpClient::new()
            .connect(&settings(&[&server], Some(Duration::from_secs(5))))
            .err()
            .unwrap();

        assert!(matches!(err, ClientError::Connect { server: s, .. } if s == server));
    }

    #[test]
    fn statistics_calls_round_robin_and_drain() {
        let (a, b) = (stub(1, StatsReply::Respond), stub(1, StatsReply::Respond));
        let conn = HttpClient::new()
            .connect(&settings(&[&a.server, &b.server], Some(Duration::from_secs(5))))
            .unwrap();

        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let tx = tx.clone();
            let params = vec![
                ProcedureParam::String("CPU".into()),
                ProcedureParam::Integer(0),
            ];
            conn.call_procedure("@Statistics", params, Box::new(move |r| {
                let _ = tx.send(r);
            }))
            .unwrap();
        }

        for _ in 0..2 {
            let response = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
            assert!(response.is_success());
            let table = &response.tables[0];
            assert_eq!(table.column_index("PERCENT_USED"), Some(1));
            assert_eq!(table.rows[0][1], Value::Integer(35));
        }
        assert!(conn.drain(Duration::from_secs(5)));
        assert_eq!(a.requests.load(Ordering::SeqCst), 2);
        assert_eq!(b.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn silent_server_bounds_connect() {
        let server = silent_server();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = HttpClient::new()
                .connect(&settings(&[&server], Some(Duration::from_millis(300))));
            let _ = tx.send(result.err());
        });

        let err = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(err, Some(ClientError::Connect { .. })));
    }

    #[test]
    fn gather_against_silent_server_ends_with_cycle_timeout() {
        let server = silent_server();
        let config = ExporterConfig {
            connection: settings(&[&server], None),
            categories: [StatsCategory::Cpu].into_iter().collect(),
            cycle_timeout: Some(Duration::from_millis(300)),
            ..ExporterConfig::default()
        };
        let mut coord =
            GatherCoordinator::new(HttpClient::new(), &config, Arc::new(MetricRegistry::new()))
                .unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(coord.gather().outcome);
        });

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            GatherOutcome::Failed
        );
    }

    #[test]
    fn timed_out_cycles_release_their_requests() {
        let stub = stub(1, StatsReply::Hold);
        let config = ExporterConfig {
            connection: settings(&[&stub.server], None),
            categories: [StatsCategory::Cpu].into_iter().collect(),
            cycle_timeout: Some(Duration::from_millis(200)),
            ..ExporterConfig::default()
        };
        let mut coord =
            GatherCoordinator::new(HttpClient::new(), &config, Arc::new(MetricRegistry::new()))
                .unwrap();

        for _ in 0..3 {
            let report = coord.gather();
            assert_eq!(report.outcome, GatherOutcome::Failed);
            assert!(!coord.is_connected());
        }

        // One ping and one held call per cycle; every held call gets hung up.
        assert!(wait_until(Duration::from_secs(5), || {
            stub.requests.load(Ordering::SeqCst) == 6 && stub.held.load(Ordering::SeqCst) == 0
        }));
    }
}
