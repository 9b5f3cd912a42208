use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::GatewayConfig;
use crate::driver::WorkerDriver;
use crate::error::GatewayResult;
use crate::router::build_router;

/// The S3 gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    driver: WorkerDriver,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, driver: WorkerDriver) -> Self {
        Self { config, driver }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn driver(&self) -> &WorkerDriver {
        &self.driver
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.driver.clone())
    }

    /// Serve until the process is stopped.
    pub async fn serve(self) -> GatewayResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` completes, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            buckets = self.driver.list_buckets().len(),
            "gateway listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        info!("gateway stopped");
        Ok(())
    }
}
