//
// src/proxy/pool.rs
//

use super::backend::Backend;
use super::forwarder::{Forwarder, HttpForwarder};
use std::sync::Arc;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("No backends configured")]
    NoBackends,

    #[error("Invalid backend address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported scheme {scheme:?} in backend address {address:?} (only http is supported)")]
    UnsupportedScheme { address: String, scheme: String },
}

/// The fixed, ordered set of backends. Order is configuration order and
/// defines rotation order; nothing is added or removed after construction.
#[derive(Debug, Clone)]
pub struct BackendPool {
    backends: Arc<[Arc<Backend>]>,
}

impl BackendPool {
    /// Builds the pool with an [`HttpForwarder`] per backend.
    pub fn build<S: AsRef<str>>(addresses: &[S]) -> Result<Self, PoolError> {
        Self::build_with(addresses, |url| {
            Arc::new(HttpForwarder::new(url.clone())) as Arc<dyn Forwarder>
        })
    }

    /// Builds the pool, binding each backend to the forwarder `make` returns.
    /// Stops at the first bad address.
    pub fn build_with<S, F>(addresses: &[S], mut make: F) -> Result<Self, PoolError>
    where
        S: AsRef<str>,
        F: FnMut(&Url) -> Arc<dyn Forwarder>,
    {
        if addresses.is_empty() {
            return Err(PoolError::NoBackends);
        }

        let mut backends = Vec::with_capacity(addresses.len());
        for address in addresses {
            let url = parse_address(address.as_ref())?;
            let forwarder = make(&url);
            let backend = Backend::new(url, forwarder);

            tracing::debug!("Configured backend {}", backend.url);
            backends.push(Arc::new(backend));
        }

        Ok(Self {
            backends: backends.into(),
        })
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Backend>> {
        self.backends.get(index)
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false for a built pool; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}

fn parse_address(address: &str) -> Result<Url, PoolError> {
    let url = Url::parse(address).map_err(|source| PoolError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;

    if url.scheme() != "http" {
        return Err(PoolError::UnsupportedScheme {
            address: address.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_configuration_order() {
        let pool = BackendPool::build(&[
            "http://localhost:8083",
            "http://localhost:8081",
            "http://localhost:8082",
        ])
        .unwrap();

        let ids: Vec<_> = pool.all_backends().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["localhost:8083", "localhost:8081", "localhost:8082"]);
        assert_eq!(pool.alive_count(), 3);
    }

    #[test]
    fn empty_list_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            BackendPool::build(&empty),
            Err(PoolError::NoBackends)
        ));
    }

    #[test]
    fn first_bad_address_aborts_construction() {
        let err = BackendPool::build(&["http://localhost:8081", "not a url", "::::"]).unwrap_err();
        match err {
            PoolError::InvalidAddress { address, .. } => assert_eq!(address, "not a url"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(matches!(
            BackendPool::build(&["https://localhost:8443"]),
            Err(PoolError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            BackendPool::build(&["ftp://files.local"]),
            Err(PoolError::UnsupportedScheme { .. })
        ));
    }
}
