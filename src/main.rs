// src/main.rs
use anyhow::{Context, Result};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use round_robin_balancer::{
    config::{self, Config},
    health::HealthChecker,
    load_balancer::RoundRobinSelector,
    metrics::MetricsRegistry,
    proxy::{BackendPool, Proxy},
    server::{RequestHandler, ServerBuilder},
};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("round_robin_balancer=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    let config = load_configuration().await?;

    // Bad addresses abort here, before anything binds.
    let pool = BackendPool::build(&config.backends).context("Invalid backend configuration")?;
    info!("Configured {} backends", pool.len());

    // Initialize metrics
    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    let health_checker = Arc::new(HealthChecker::new(
        config.health_check.clone(),
        pool.clone(),
        Some(metrics.clone()),
    ));
    if config.health_check.initial_probe {
        health_checker.check_all_backends().await;
        info!("{}/{} backends alive at startup", pool.alive_count(), pool.len());
    }
    let health_task = tokio::spawn(health_checker.clone().start());

    if config.metrics.enabled {
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone())?;
    }

    let selector = Arc::new(RoundRobinSelector::new(pool));
    let handler = RequestHandler::new(Arc::new(Proxy::new(selector, metrics)));

    info!("Starting load balancer on {}", config.listen);
    ServerBuilder::new(config.listen)
        .with_handler(move |peer| handler.for_peer(peer))
        .bind()
        .await?
        .serve(shutdown_signal())
        .await?;

    health_checker.shutdown();
    if let Err(e) = health_task.await {
        error!("Health checker task failed: {}", e);
    }
    Ok(())
}

async fn load_configuration() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading configuration from: {}", DEFAULT_CONFIG_PATH);
            config::load_config(DEFAULT_CONFIG_PATH).await
        }
        None => {
            info!("No configuration file, using built-in defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn start_metrics_server(addr: SocketAddr, registry: MetricsRegistry, path: String) -> Result<()> {
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(path);
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move { Ok::<_, Infallible>(metrics_response(&req, &registry, &path)) }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind metrics listener {}", addr))?
        .serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

fn metrics_response(req: &Request<Body>, registry: &MetricsRegistry, path: &str) -> Response<Body> {
    if req.uri().path() != path {
        return status_response(StatusCode::NOT_FOUND, "Not Found");
    }

    match registry.gather() {
        Ok(metrics) => {
            let mut response = Response::new(Body::from(metrics));
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            status_response(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable")
        }
    }
}

fn status_response(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

// Stops the listener; in-flight requests are not drained.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
