//! Access log for the exporter's endpoints.
//!
//! Scrapes are logged at info level together with the gather outcome the
//! metrics handler attaches to its response, so a replayed or failed scrape
//! can be told apart from a fresh one. Other requests go to debug.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::{ConnectInfo, Request};
use axum::response::Response;
use tracing::{debug, info};

use crate::handlers::ScrapeSummary;

#[derive(Clone)]
pub(crate) struct AccessLogLayer;

impl<S> tower::Layer<S> for AccessLogLayer {
    type Service = AccessLogService<S>;
    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService { inner }
    }
}

#[derive(Clone)]
pub(crate) struct AccessLogService<S> {
    inner: S,
}

impl<S> tower::Service<Request> for AccessLogService<S>
where
    S: tower::Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let request_line = format!("{} {}", req.method(), req.uri().path());
        let scraper = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| "-".to_owned());
        let started = Instant::now();

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(req).await?;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let status = response.status().as_u16();
            let bytes = body_bytes(&response);
            match response.extensions().get::<ScrapeSummary>() {
                Some(scrape) => info!(
                    scraper,
                    status,
                    elapsed_ms,
                    bytes,
                    outcome = ?scrape.outcome,
                    cycle_ran = scrape.cycle_ran,
                    "{request_line}"
                ),
                None => debug!(scraper, status, elapsed_ms, bytes, "{request_line}"),
            }
            Ok(response)
        })
    }
}

/// Uncompressed body size, when the body knows it up front.
fn body_bytes(response: &Response) -> Option<u64> {
    response.body().size_hint().exact()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::convert::Infallible;
    use tower::{Layer, ServiceExt};
    use voltdb_exporter_core::GatherOutcome;

    fn scrape_response() -> Response {
        let mut response = Response::new(Body::from("voltdb_cpu_usage_percent 1\n"));
        response.extensions_mut().insert(ScrapeSummary {
            outcome: GatherOutcome::Degraded,
            cycle_ran: false,
        });
        response
    }

    #[test]
    fn body_size_is_known_for_rendered_scrapes() {
        assert_eq!(body_bytes(&scrape_response()), Some(27));
    }

    #[tokio::test]
    async fn response_passes_through_with_scrape_summary() {
        let service = AccessLogLayer.layer(tower::service_fn(|_req: Request| async {
            Ok::<_, Infallible>(scrape_response())
        }));

        let response = service
            .oneshot(
                axum::http::Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.extensions().get::<ScrapeSummary>(),
            Some(&ScrapeSummary {
                outcome: GatherOutcome::Degraded,
                cycle_ran: false,
            })
        );
    }
}
