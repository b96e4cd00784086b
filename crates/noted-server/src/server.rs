use std::sync::Arc;

use noted_kv::{KvDatabase, KvStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::log::ServerLog;
use crate::router::build_router;

const DATABASE_NAME: &str = "noted-server";
const LOGS_PARTITION: &str = "logs";
const CONTENT_PARTITION: &str = "content";

/// Noted store server.
pub struct NotedServer {
    config: ServerConfig,
}

impl NotedServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open storage and build handler state.
    pub async fn state(&self) -> ServerResult<AppState> {
        let partitions = [LOGS_PARTITION, CONTENT_PARTITION];
        let db = if self.config.in_memory {
            KvDatabase::in_memory(DATABASE_NAME, &partitions)
        } else {
            KvDatabase::open_dir(&self.config.data_dir, DATABASE_NAME, &partitions).await?
        };
        let logs: Arc<dyn KvStore> = db.partition(LOGS_PARTITION)?;
        Ok(AppState {
            log: Arc::new(ServerLog::open(logs).await?),
            content: db.partition(CONTENT_PARTITION)?,
        })
    }

    /// Build the router (useful for testing).
    pub async fn router(&self) -> ServerResult<axum::Router> {
        Ok(build_router(self.state().await?))
    }

    /// Start serving requests on the configured address.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let app = self.router().await?;
        tracing::info!(addr = %listener.local_addr()?, in_memory = self.config.in_memory, "noted server listening");
        axum::serve(listener, app).await.map_err(ServerError::Io)
    }
}
