//! demos/test_backend.rs
//! Run: cargo run --example test_backend -- <port> [name]
//!
//! A throwaway upstream for trying the balancer by hand. Every response
//! names the backend that produced it.

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use rand::Rng;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

#[derive(Clone)]
struct BackendState {
    port:        u16,
    name:        String,
    req_counter: Arc<AtomicU64>,
    jitter_ms:   u64,
}

async fn handle(
    req: Request<Body>,
    state: BackendState,
) -> Result<Response<Body>, Infallible> {
    let n = state.req_counter.fetch_add(1, Ordering::SeqCst) + 1;
    let path = req.uri().path().to_owned();
    let forwarded_for = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned();

    let delay = if state.jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=state.jitter_ms)
    } else {
        0
    };
    if delay > 0 {
        sleep(Duration::from_millis(delay)).await;
    }

    let body = format!(
        r#"{{"backend":"{}","port":{},"req":{},"path":"{}","forwarded_for":"{}"}}"#,
        state.name, state.port, n, path, forwarded_for
    );

    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    if let Ok(name) = hyper::header::HeaderValue::from_str(&state.name) {
        headers.insert("x-backend-name", name);
    }
    Ok(response)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "8081".into())
        .parse()?;
    let name = std::env::args()
        .nth(2)
        .or_else(|| std::env::var("BACKEND_NAME").ok())
        .unwrap_or_else(|| format!("backend-{port}"));
    let jitter_ms =
        std::env::var("JITTER_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(0);

    let state = BackendState {
        port,
        name: name.clone(),
        req_counter: Arc::new(AtomicU64::new(0)),
        jitter_ms,
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                handle(req, st.clone())
            }))
        }
    });

    println!("Mock backend '{}' on http://{}  [jitter={}ms]", name, addr, jitter_ms);

    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
