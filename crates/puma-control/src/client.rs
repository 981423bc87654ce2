//! Control app HTTP client.

use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, HOST, USER_AGENT};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use tracing::debug;
use url::{Position, Url};

use puma_core::{ConfigError, ExporterConfig, StatusKind};

use crate::error::FetchError;

const USER_AGENT_VALUE: &str = concat!("puma-exporter/", env!("CARGO_PKG_VERSION"));

/// Fetches raw status documents from the Puma control app.
///
/// Stateless apart from its configuration; cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ControlClient {
    base: Url,
    token: String,
    timeout: Duration,
}

impl ControlClient {
    pub fn new(base: Url, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base,
            token: token.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.control_base()?,
            config.auth_token.clone(),
            config.timeout,
        ))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `{base}/{path}?token={token}` for the given response family.
    ///
    /// A path prefix on the base URL is kept; the token is always sent,
    /// even when empty.
    pub fn endpoint_url(&self, kind: StatusKind) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}/{}", self.base.path().trim_end_matches('/'), kind.path());
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("token", &self.token);
        url
    }

    /// Fetch the endpoint for `kind`.
    pub async fn fetch_status(&self, kind: StatusKind) -> Result<Bytes, FetchError> {
        self.fetch(&self.endpoint_url(kind)).await
    }

    /// GET `url` and return the body of any response below 400.
    ///
    /// The whole exchange (connect, request, body) is bounded by the
    /// client timeout; running out of time is a transport failure.
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let shown = redact(url);
        let transport = |reason: String| FetchError::Transport {
            url: shown.clone(),
            reason,
        };

        let host = url
            .host_str()
            .ok_or_else(|| transport("url has no host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let address = format!("{host}:{port}");
        let host_header = match url.port() {
            Some(p) => format!("{host}:{p}"),
            None => host.to_string(),
        };
        let target = &url[Position::BeforePath..];

        let result = tokio::time::timeout(self.timeout, async {
            let stream = tokio::net::TcpStream::connect(&address)
                .await
                .map_err(|e| transport(format!("connect {address}: {e}")))?;

            let io = TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| transport(format!("handshake: {e}")))?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, "control connection closed with error");
                }
            });

            let req = http::Request::builder()
                .method(http::Method::GET)
                .uri(target)
                .header(HOST, host_header.as_str())
                .header(USER_AGENT, USER_AGENT_VALUE)
                .header(ACCEPT, "application/json")
                .body(Empty::<Bytes>::new())
                .map_err(|e| transport(format!("build request: {e}")))?;

            let resp = sender
                .send_request(req)
                .await
                .map_err(|e| transport(format!("send request: {e}")))?;

            let status = resp.status();
            if status.as_u16() >= 400 {
                return Err(FetchError::Upstream {
                    url: shown.clone(),
                    status: status.as_u16(),
                });
            }

            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| transport(format!("read body: {e}")))?
                .to_bytes();

            debug!(url = %shown, %status, bytes = body.len(), "control app responded");
            Ok(body)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(transport(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Render `url` with the `token` query value masked, for logs and errors.
pub fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "token") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::extract::RawQuery;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    fn client_for(base: &str, token: &str) -> ControlClient {
        ControlClient::new(Url::parse(base).unwrap(), token, Duration::from_secs(2))
    }

    async fn spawn_upstream(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[test]
    fn endpoint_url_appends_path_and_token() {
        let client = client_for("http://127.0.0.1:7353", "abc");
        assert_eq!(
            client.endpoint_url(StatusKind::Stats).as_str(),
            "http://127.0.0.1:7353/stats?token=abc"
        );
        assert_eq!(
            client.endpoint_url(StatusKind::GcStats).as_str(),
            "http://127.0.0.1:7353/gc-stats?token=abc"
        );
        assert_eq!(
            client.endpoint_url(StatusKind::ClusterStats).as_str(),
            "http://127.0.0.1:7353/stats?token=abc"
        );
    }

    #[test]
    fn endpoint_url_keeps_path_prefix() {
        let client = client_for("http://puma.internal:9293/control/", "t");
        assert_eq!(
            client.endpoint_url(StatusKind::GcStats).as_str(),
            "http://puma.internal:9293/control/gc-stats?token=t"
        );
    }

    #[test]
    fn endpoint_url_encodes_token() {
        let client = client_for("http://127.0.0.1:7353", "a b&c=d");
        let url = client.endpoint_url(StatusKind::Stats);
        let token: Vec<_> = url.query_pairs().filter(|(k, _)| k == "token").collect();
        assert_eq!(token.len(), 1);
        assert_eq!(token[0].1, "a b&c=d");
    }

    #[test]
    fn endpoint_url_sends_empty_token() {
        let client = client_for("http://127.0.0.1:7353", "");
        assert_eq!(
            client.endpoint_url(StatusKind::Stats).as_str(),
            "http://127.0.0.1:7353/stats?token="
        );
    }

    #[test]
    fn redact_masks_token() {
        let client = client_for("http://127.0.0.1:7353", "s3cret");
        let shown = redact(&client.endpoint_url(StatusKind::Stats));
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("token=REDACTED"));
    }

    #[test]
    fn redact_leaves_tokenless_url_alone() {
        let url = Url::parse("http://127.0.0.1:7353/stats").unwrap();
        assert_eq!(redact(&url), "http://127.0.0.1:7353/stats");
    }

    #[tokio::test]
    async fn fetch_returns_body_and_sends_token() {
        let router = Router::new().route(
            "/stats",
            get(|RawQuery(query): RawQuery| async move { query.unwrap_or_default() }),
        );
        let addr = spawn_upstream(router).await;

        let client = client_for(&format!("http://{addr}"), "abc");
        let body = client.fetch_status(StatusKind::Stats).await.unwrap();
        assert_eq!(&body[..], b"token=abc");
    }

    #[tokio::test]
    async fn fetch_500_is_upstream_error() {
        let router = Router::new().route(
            "/stats",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, r#"{"running": 9}"#) }),
        );
        let addr = spawn_upstream(router).await;

        let client = client_for(&format!("http://{addr}"), "abc");
        let err = client.fetch_status(StatusKind::Stats).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(!err.to_string().contains("abc"));
    }

    #[tokio::test]
    async fn fetch_403_is_upstream_error() {
        let router = Router::new().route(
            "/gc-stats",
            get(|| async { (StatusCode::FORBIDDEN, "Invalid auth token") }),
        );
        let addr = spawn_upstream(router).await;

        let client = client_for(&format!("http://{addr}"), "wrong");
        let err = client.fetch_status(StatusKind::GcStats).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn fetch_redirect_is_not_a_failure() {
        let router = Router::new().route(
            "/stats",
            get(|| async { (StatusCode::FOUND, [("location", "/elsewhere")], "moved") }),
        );
        let addr = spawn_upstream(router).await;

        let client = client_for(&format!("http://{addr}"), "");
        let body = client.fetch_status(StatusKind::Stats).await.unwrap();
        assert_eq!(&body[..], b"moved");
    }

    #[tokio::test]
    async fn fetch_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}"), "abc");
        let err = client.fetch_status(StatusKind::Stats).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn fetch_timeout_is_transport_error() {
        let router = Router::new().route(
            "/stats",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let addr = spawn_upstream(router).await;

        let client = ControlClient::new(
            Url::parse(&format!("http://{addr}")).unwrap(),
            "abc",
            Duration::from_millis(100),
        );
        let err = client.fetch_status(StatusKind::Stats).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("timed out"));
    }
}
