//! Metrics HTTP server.

use std::future::Future;
use std::net::SocketAddr;

use event_vault::ExpositionRegistry;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{ExporterError, ExporterResult};
use crate::routes::create_router;

/// HTTP server exposing the registry to scrapers.
#[derive(Debug, Clone)]
pub struct MetricsServer {
    registry: ExpositionRegistry,
}

impl MetricsServer {
    /// Create a server over the given registry.
    #[must_use]
    pub const fn new(registry: ExpositionRegistry) -> Self {
        Self { registry }
    }

    /// Get the registry this server exposes.
    #[must_use]
    pub const fn registry(&self) -> &ExpositionRegistry {
        &self.registry
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails or the server stops
    /// with an I/O error.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ExporterResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ExporterError::BindFailed(addr, e))?;

        let local = listener.local_addr().unwrap_or(addr);
        info!(addr = %local, "Metrics server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ExporterError::Server)?;

        info!("Metrics server shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_server_shares_registry() {
        let registry = ExpositionRegistry::new();
        let server = MetricsServer::new(registry.clone());

        assert!(!server.registry().is_published("anything"));
        let _router = server.router();
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let server = MetricsServer::new(ExpositionRegistry::new());
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(addr, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(());

        let result = tokio::time::timeout(Duration::from_secs(1), server_handle).await;
        assert!(result.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_serve_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let server = MetricsServer::new(ExpositionRegistry::new());

        let result = server.serve_with_shutdown(addr, std::future::pending()).await;

        assert!(matches!(result, Err(ExporterError::BindFailed(a, _)) if a == addr));
    }
}
