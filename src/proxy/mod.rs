//
// src/proxy/mod.rs
//
mod proxy;
mod backend;
mod forwarder;
mod pool;

pub use proxy::{Proxy, ProxyError, UNAVAILABLE_MESSAGE};
pub use backend::Backend;
pub use forwarder::{Forwarder, HttpForwarder};
pub use pool::{BackendPool, PoolError};
