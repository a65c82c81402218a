// src/health/probe.rs
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connect to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// One TCP connect attempt against `address` (`host:port`). The connection
/// is dropped as soon as it is established.
pub async fn probe(address: &str, limit: Duration) -> Result<(), ProbeError> {
    bounded(address, limit, TcpStream::connect(address)).await
}

async fn bounded<T, F>(address: &str, limit: Duration, connect: F) -> Result<(), ProbeError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match timeout(limit, connect).await {
        Ok(Ok(_conn)) => Ok(()),
        Ok(Err(source)) => Err(ProbeError::Connect {
            address: address.to_string(),
            source,
        }),
        Err(_) => Err(ProbeError::Timeout {
            address: address.to_string(),
            timeout: limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn succeeds_against_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        probe(&address, Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = probe(&address, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Connect { .. }));
    }

    #[tokio::test]
    async fn unanswered_connect_times_out() {
        let limit = Duration::from_millis(20);
        let never = std::future::pending::<std::io::Result<TcpStream>>();

        let err = bounded("10.255.255.1:80", limit, never).await.unwrap_err();
        match err {
            ProbeError::Timeout { address, timeout } => {
                assert_eq!(address, "10.255.255.1:80");
                assert_eq!(timeout, limit);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
