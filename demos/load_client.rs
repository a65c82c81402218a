//! demos/load_client.rs
//! Run: cargo run --example load_client -- [url] [concurrency]
//!
//! Fires concurrent GETs at the balancer and tallies which backend answered.

use hyper::{body::to_bytes, Body, Client, Request, StatusCode};
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".into());
    let concurrency: usize = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "30".into())
        .parse()?;

    let client = Client::new();
    let mut tasks = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            let req = Request::get(url.as_str()).body(Body::empty())?;
            let resp = client.request(req).await?;
            let status = resp.status();
            let backend = resp
                .headers()
                .get("x-backend-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_owned();
            to_bytes(resp.into_body()).await?;
            Ok::<_, anyhow::Error>((status, backend))
        }));
    }

    let mut by_status: BTreeMap<u16, usize> = BTreeMap::new();
    let mut by_backend: BTreeMap<String, usize> = BTreeMap::new();
    for result in futures::future::join_all(tasks).await {
        match result? {
            Ok((status, backend)) => {
                *by_status.entry(status.as_u16()).or_default() += 1;
                if status == StatusCode::OK {
                    *by_backend.entry(backend).or_default() += 1;
                }
            }
            Err(e) => println!("request failed: {e}"),
        }
    }

    println!("status codes: {by_status:?}");
    println!("backends:     {by_backend:?}");
    Ok(())
}
