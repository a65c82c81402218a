// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use anyhow::{Context, Result};
use hyper::{server::conn::Http, Body, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::Service;

/// Builder pattern so `main.rs` can inject its handler. The factory gets the
/// peer address of every accepted connection.
pub struct ServerBuilder<F> {
    addr: SocketAddr,
    make_handler: Option<F>,
}

impl<F, H> ServerBuilder<F>
where
    F: Fn(SocketAddr) -> H + Send + Sync + 'static,
    H: Service<Request<Body>, Response = Response<Body>> + Send + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            make_handler: None,
        }
    }

    pub fn with_handler(mut self, make_handler: F) -> Self {
        self.make_handler = Some(make_handler);
        self
    }

    /// Binds the TCP listener without accepting yet.
    pub async fn bind(self) -> Result<BoundServer<F>> {
        let make_handler = self
            .make_handler
            .context("handler must be set via with_handler()")?;
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;

        Ok(BoundServer {
            listener,
            make_handler,
        })
    }
}

pub struct BoundServer<F> {
    listener: TcpListener,
    make_handler: F,
}

impl<F, H> BoundServer<F>
where
    F: Fn(SocketAddr) -> H + Send + Sync + 'static,
    H: Service<Request<Body>, Response = Response<Body>> + Send + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts until `shutdown` resolves, one Tokio task per connection.
    /// Connections already accepted are left to finish on their own.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tracing::info!("HTTP server listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        tracing::warn!(%err, "accept failed");
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!("Listener stopped accepting connections");
                    return Ok(());
                }
            };
            let svc = (self.make_handler)(peer);

            tokio::spawn(async move {
                let http = Http::new();
                if let Err(err) = http.serve_connection(stream, svc).await {
                    tracing::warn!(%peer, %err, "connection error");
                }
            });
        }
    }
}
