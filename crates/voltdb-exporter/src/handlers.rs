//! HTTP request handlers: scrape endpoint and root page.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use voltdb_exporter_core::registry::TEXT_CONTENT_TYPE;
use voltdb_exporter_core::{GatherOutcome, ScrapeError, Scraper};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) scraper: Arc<dyn Scraper>,
    pub(crate) banner: Arc<str>,
}

/// Attached to `/metrics` responses for the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScrapeSummary {
    pub(crate) outcome: GatherOutcome,
    pub(crate) cycle_ran: bool,
}

pub(crate) async fn handle_root(State(state): State<AppState>) -> String {
    format!("{}\n", state.banner)
}

pub(crate) async fn handle_metrics(State(state): State<AppState>) -> Response {
    let scraper = Arc::clone(&state.scraper);
    // A gather cycle blocks on the database; keep it off the async workers.
    let scrape = match tokio::task::spawn_blocking(move || scraper.handle_scrape()).await {
        Ok(scrape) => scrape,
        Err(e) => {
            error!(error = %e, "scrape task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "scrape failed\n").into_response();
        }
    };

    let summary = ScrapeSummary {
        outcome: scrape.outcome,
        cycle_ran: scrape.cycle_ran,
    };
    let mut response = match scrape.body {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(ScrapeError::UpstreamUnavailable) => {
            warn!(outcome = ?scrape.outcome, "no statistics available yet");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "VoltDB statistics unavailable\n",
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to serve metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)).into_response()
        }
    };
    response.extensions_mut().insert(summary);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    use voltdb_exporter_core::client::mock::MockClient;
    use voltdb_exporter_core::{
        ExporterConfig, GatherCoordinator, MetricRegistry, ScrapeGate, StatsCategory,
    };

    fn state(client: &MockClient) -> AppState {
        let config = ExporterConfig {
            categories: [StatsCategory::Cpu, StatsCategory::Latency].into_iter().collect(),
            ..ExporterConfig::default()
        };
        let coordinator =
            GatherCoordinator::new(client.clone(), &config, Arc::new(MetricRegistry::new()))
                .unwrap();
        AppState {
            scraper: Arc::new(ScrapeGate::new(coordinator, Duration::ZERO)),
            banner: Arc::from("VoltDB Prometheus exporter for localhost port 8080"),
        }
    }

    struct Reply {
        status: StatusCode,
        content_type: Option<String>,
        scrape: Option<ScrapeSummary>,
        body: String,
    }

    async fn get(state: AppState, uri: &str) -> Reply {
        let response = crate::router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let scrape = response.extensions().get::<ScrapeSummary>().copied();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply {
            status,
            content_type,
            scrape,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    #[tokio::test]
    async fn root_shows_banner() {
        let reply = get(state(&MockClient::healthy_cluster()), "/").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, "VoltDB Prometheus exporter for localhost port 8080\n");
        assert_eq!(reply.scrape, None);
    }

    #[tokio::test]
    async fn metrics_returns_exposition() {
        let reply = get(state(&MockClient::healthy_cluster()), "/metrics").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type.as_deref(), Some(TEXT_CONTENT_TYPE));
        assert!(reply.body.contains(r#"voltdb_cpu_usage_percent{hostname="h1"} 1"#));
        assert!(reply.body.contains("voltdb_latency_tps"));
        assert_eq!(
            reply.scrape,
            Some(ScrapeSummary {
                outcome: GatherOutcome::Success,
                cycle_ran: true,
            })
        );
    }

    #[tokio::test]
    async fn metrics_without_any_values_is_gateway_timeout() {
        let client = MockClient::healthy_cluster();
        client.fail_next_connects(1);
        let reply = get(state(&client), "/metrics").await;
        assert_eq!(reply.status, StatusCode::GATEWAY_TIMEOUT);
        assert!(reply.body.contains("unavailable"));
        assert_eq!(reply.scrape.map(|s| s.outcome), Some(GatherOutcome::Failed));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let reply = get(state(&MockClient::healthy_cluster()), "/api").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }
}
