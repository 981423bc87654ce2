//! Route handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse};
use tracing::error;

use crate::ApiState;

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
///
/// Reads current gauge values only; never reaches the control app.
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match puma_metrics::render(&state.metrics) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, puma_metrics::CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ── Landing page ───────────────────────────────────────────────

/// GET /
pub async fn landing() -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Puma exporter</title></head>\n\
         <body>\n\
         <h1>Puma exporter</h1>\n\
         <p>Version: {}</p>\n\
         <p><a href=\"/metrics\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        env!("CARGO_PKG_VERSION")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use http_body_util::BodyExt;
    use puma_core::{StatusKind, decode};
    use puma_metrics::{PumaMetrics, translate};

    fn test_state() -> ApiState {
        ApiState {
            metrics: Arc::new(PumaMetrics::new().unwrap()),
        }
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn metrics_sets_exposition_content_type() {
        let resp = prometheus_metrics(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn metrics_reflects_current_values() {
        let state = test_state();
        translate(
            &decode(br#"{"running": 4, "backlog": 2}"#, StatusKind::Stats).unwrap(),
            &state.metrics,
        );

        let resp = prometheus_metrics(State(state)).await.into_response();
        let body = body_text(resp).await;
        assert!(body.contains("puma_thread_count 4\n"));
        assert!(body.contains("puma_request_backlog 2\n"));
    }

    #[tokio::test]
    async fn landing_links_to_metrics() {
        let Html(page) = landing().await;
        assert!(page.contains("<title>Puma exporter</title>"));
        assert!(page.contains("<a href=\"/metrics\">"));
        assert!(page.contains(env!("CARGO_PKG_VERSION")));
    }
}
