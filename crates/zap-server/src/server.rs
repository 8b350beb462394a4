use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// ZapLink HTTP server.
pub struct ZapServer {
    config: ServerConfig,
}

impl ZapServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router with freshly wired backends (useful for testing).
    pub async fn router(&self) -> ServerResult<axum::Router> {
        Ok(build_router(AppState::from_config(self.config.clone()).await?))
    }

    /// Start serving requests until the process is stopped.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router().await?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "zap server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
