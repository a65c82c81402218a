// src/proxy/backend.rs
use super::forwarder::Forwarder;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// One upstream server. The URL is fixed for the lifetime of the process;
/// only the liveness flag changes, and only the health checker writes it.
pub struct Backend {
    pub id: String,
    pub url: Url,
    forwarder: Arc<dyn Forwarder>,

    // Runtime state
    alive: AtomicBool,
    last_health_check: RwLock<Option<DateTime<Utc>>>,
}

impl Backend {
    /// Backends start out alive until the first probe says otherwise.
    pub fn new(url: Url, forwarder: Arc<dyn Forwarder>) -> Self {
        let id = format!(
            "{}:{}",
            url.host_str().unwrap_or("unknown"),
            url.port_or_known_default().unwrap_or(80)
        );

        Self {
            id,
            url,
            forwarder,
            alive: AtomicBool::new(true),
            last_health_check: RwLock::new(None),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Records a probe result. Returns the previous liveness value.
    pub async fn set_alive(&self, alive: bool) -> bool {
        let previous = self.alive.swap(alive, Ordering::AcqRel);
        *self.last_health_check.write().await = Some(Utc::now());
        previous
    }

    pub async fn last_health_check(&self) -> Option<DateTime<Utc>> {
        *self.last_health_check.read().await
    }

    /// `host:port` used for TCP reachability probes.
    pub fn probe_address(&self) -> &str {
        &self.id
    }

    pub fn forwarder(&self) -> &Arc<dyn Forwarder> {
        &self.forwarder
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("alive", &self.is_alive())
            .finish()
    }
}
