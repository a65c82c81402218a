// ────────────────────────────────
// src/proxy/proxy.rs
// Request dispatch: pick a backend, forward once, report.
// ────────────────────────────────

use crate::load_balancer::RoundRobinSelector;
use crate::metrics::MetricsCollector;
use hyper::{Body, Request, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};

pub const UNAVAILABLE_MESSAGE: &str = "no backends available, try again later";

pub struct Proxy {
    selector: Arc<RoundRobinSelector>,
    metrics: Arc<MetricsCollector>,
}

impl Proxy {
    pub fn new(selector: Arc<RoundRobinSelector>, metrics: Arc<MetricsCollector>) -> Self {
        Self { selector, metrics }
    }

    /// Dispatches one request to exactly one backend. There is no fallback
    /// to another backend when forwarding fails.
    pub async fn handle(
        &self,
        req: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ProxyError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            let backend = match self.selector.next_backend().await {
                Some(backend) => backend,
                None => {
                    warn!("No live backend for request");
                    self.metrics.record_unavailable();
                    return Err(ProxyError::NoHealthyBackends);
                }
            };

            let start = Instant::now();
            let result = backend.forwarder().forward(req, client_addr).await;

            let status = match &result {
                Ok(response) => response.status(),
                Err(e) => e.status(),
            };
            self.metrics
                .record_request(&backend.id, status.as_u16(), start.elapsed());

            match &result {
                Ok(_) => info!("Using {} as backend", backend.url),
                Err(e) => warn!(backend = %backend.url, %e, "Forwarding failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No healthy backends available")]
    NoHealthyBackends,

    #[error("Upstream error: {0}")]
    Upstream(#[from] hyper::Error),

    #[error("Invalid upstream URI: {0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUri),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoHealthyBackends => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidUri(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let message = match err {
            ProxyError::NoHealthyBackends => UNAVAILABLE_MESSAGE,
            ProxyError::Upstream(_) => "Bad gateway",
            ProxyError::InvalidUri(_) => "Internal server error",
        };

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = err.status();
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_maps_to_503_with_message() {
        let response: Response<Body> = ProxyError::NoHealthyBackends.into();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], UNAVAILABLE_MESSAGE.as_bytes());
    }
}
