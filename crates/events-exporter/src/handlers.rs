//! HTTP request handlers for the exporter.

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use event_vault::ExpositionRegistry;

use crate::error::ExporterResult;

const INDEX_PAGE: &str = r#"<html>
<head><title>Events Exporter</title></head>
<body>
<h1>Events Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// Handle GET /metrics - text exposition of every published family.
///
/// An encoding failure is answered with a 500 instead of an empty body.
pub async fn metrics(
    State(registry): State<ExpositionRegistry>,
) -> ExporterResult<impl IntoResponse> {
    exposition(registry.encode())
}

fn exposition(encoded: event_vault::Result<String>) -> ExporterResult<impl IntoResponse> {
    let body = encoded?;
    Ok(([(header::CONTENT_TYPE, ExpositionRegistry::content_type())], body))
}

/// Handle GET /healthz - liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Handle GET / - landing page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use event_vault::{GaugeCollector, Mapping, Sample, VaultError};

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_renders_registry() {
        let registry = ExpositionRegistry::new();
        let collector = Arc::new(
            GaugeCollector::new(
                Mapping::new("demo_info", "Demo", Duration::from_secs(60)).with_labels(["kind"]),
            )
            .unwrap(),
        );
        collector
            .store(chrono::Utc::now(), Sample::new(["Pod"], 2.0).with_id("a"))
            .unwrap();
        registry.publish(collector).unwrap();

        let response = metrics(State(registry)).await.into_response();

        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            ExpositionRegistry::content_type()
        );
        let body = body_string(response).await;
        assert!(body.contains("# HELP demo_info Demo"));
        assert!(body.contains("demo_info{kind=\"Pod\"} 2"));
    }

    #[tokio::test]
    async fn test_encode_failure_is_server_error() {
        let failed = Err(VaultError::Exposition {
            reason: "formatter error".to_string(),
        });

        let response = exposition(failed).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("failed to encode exposition"));
    }

    #[tokio::test]
    async fn test_healthz() {
        assert_eq!(healthz().await, "ok");
    }

    #[tokio::test]
    async fn test_index_links_metrics() {
        let body = body_string(index().await.into_response()).await;
        assert!(body.contains("href=\"/metrics\""));
    }
}
