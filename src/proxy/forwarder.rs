// ────────────────────────────────
// src/proxy/forwarder.rs
// Single-host reverse proxying over a hyper client.
// ────────────────────────────────
use super::ProxyError;
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, TE};
use hyper::{Body, Client, Request, Response, Uri, Version};
use std::net::SocketAddr;
use url::Url;

/// Relays one request to a fixed upstream and hands back whatever it answered.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        req: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ProxyError>;
}

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub struct HttpForwarder {
    target: Url,
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            client: Client::new(),
        }
    }

    /// Rewrites the inbound request URI onto the target's scheme, authority
    /// and path prefix.
    pub fn rewrite_uri(&self, inbound: &Uri) -> Result<Uri, ProxyError> {
        let path = join_paths(self.target.path(), inbound.path());
        let query = match (self.target.query(), inbound.query()) {
            (Some(t), Some(i)) if !t.is_empty() && !i.is_empty() => Some(format!("{t}&{i}")),
            (Some(t), _) if !t.is_empty() => Some(t.to_string()),
            (_, Some(i)) if !i.is_empty() => Some(i.to_string()),
            _ => None,
        };

        let authority = match self.target.port() {
            Some(port) => format!("{}:{}", self.target.host_str().unwrap_or_default(), port),
            None => self.target.host_str().unwrap_or_default().to_string(),
        };

        let mut uri = format!("{}://{}{}", self.target.scheme(), authority, path);
        if let Some(query) = query {
            uri.push('?');
            uri.push_str(&query);
        }
        uri.parse::<Uri>().map_err(ProxyError::from)
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        req: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = req.into_parts();
        parts.uri = self.rewrite_uri(&parts.uri)?;
        // The upstream client only speaks HTTP/1, whatever the inbound version.
        parts.version = Version::HTTP_11;
        strip_request_hop_by_hop(&mut parts.headers);

        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        let mut response = self
            .client
            .request(Request::from_parts(parts, body))
            .await?;
        strip_hop_by_hop(response.headers_mut());
        Ok(response)
    }
}

fn join_paths(prefix: &str, path: &str) -> String {
    match (prefix.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", prefix, &path[1..]),
        (false, false) => format!("{prefix}/{path}"),
        _ => format!("{prefix}{path}"),
    }
}

/// Like [`strip_hop_by_hop`], but keeps `TE: trailers` so trailer
/// support is still announced upstream.
fn strip_request_hop_by_hop(headers: &mut HeaderMap) {
    let wants_trailers = headers
        .get_all(TE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("trailers"));

    strip_hop_by_hop(headers);
    if wants_trailers {
        headers.insert(TE, HeaderValue::from_static("trailers"));
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by Connection are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {ip}"),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(target: &str) -> HttpForwarder {
        HttpForwarder::new(Url::parse(target).unwrap())
    }

    #[test]
    fn rewrites_onto_target_authority() {
        let f = forwarder("http://localhost:8081");
        let uri = f.rewrite_uri(&"/users?id=7".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:8081/users?id=7");
    }

    #[test]
    fn joins_path_prefix_with_single_slash() {
        let f = forwarder("http://10.0.0.5:9000/api/");
        let uri = f.rewrite_uri(&"/v1/items".parse().unwrap()).unwrap();
        assert_eq!(uri.path(), "/api/v1/items");

        let f = forwarder("http://10.0.0.5:9000/api");
        let uri = f.rewrite_uri(&"/v1/items".parse().unwrap()).unwrap();
        assert_eq!(uri.path(), "/api/v1/items");
    }

    #[test]
    fn merges_target_and_request_queries() {
        let f = forwarder("http://localhost:8081/?tenant=a");
        let uri = f.rewrite_uri(&"/search?q=rust".parse().unwrap()).unwrap();
        assert_eq!(uri.query(), Some("tenant=a&q=rust"));
    }

    #[test]
    fn strips_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-session"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-kept", HeaderValue::from_static("yes"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get(CONNECTION).is_none());
        assert!(headers.get("x-session").is_none());
        assert!(headers.get("keep-alive").is_none());
        assert_eq!(headers.get("x-kept").unwrap(), "yes");
    }

    #[test]
    fn request_keeps_te_trailers_only() {
        let mut headers = HeaderMap::new();
        headers.insert(TE, HeaderValue::from_static("gzip, trailers"));
        strip_request_hop_by_hop(&mut headers);
        assert_eq!(headers.get(TE).unwrap(), "trailers");

        let mut headers = HeaderMap::new();
        headers.insert(TE, HeaderValue::from_static("gzip"));
        strip_request_hop_by_hop(&mut headers);
        assert!(headers.get(TE).is_none());
    }

    #[test]
    fn appends_to_existing_forwarded_for() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "192.168.1.10:5000".parse().unwrap());
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "192.168.1.10");

        append_forwarded_for(&mut headers, "10.0.0.1:6000".parse().unwrap());
        assert_eq!(
            headers.get(X_FORWARDED_FOR).unwrap(),
            "192.168.1.10, 10.0.0.1"
        );
    }
}
