use deadpool::{managed, Runtime};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::error::StarNeighboursError as ServerError;
use crate::store::{SurrealClient, SurrealConnectionConfig};

#[derive(Debug)]
pub struct SurrealConnectionManager {
    config: SurrealConnectionConfig,
    // In-memory databases live inside a single handle, so every pooled
    // object must share it instead of opening a fresh empty database.
    embedded: OnceCell<SurrealClient>,
}

impl SurrealConnectionManager {
    pub fn new(config: SurrealConnectionConfig) -> Self {
        Self { config, embedded: OnceCell::new() }
    }
}

impl managed::Manager for SurrealConnectionManager {
    type Type = SurrealClient;
    type Error = ServerError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let connect = || async {
            SurrealClient::connect(&self.config)
                .await
                .map_err(|e| ServerError::DatabaseError(format!("{:#}", e)))
        };

        if self.config.is_embedded() {
            return self.embedded.get_or_try_init(connect).await.cloned();
        }
        connect().await
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> managed::RecycleResult<Self::Error> {
        match conn.ping().await {
            Ok(_) => Ok(()),
            Err(e) => Err(managed::RecycleError::Backend(ServerError::DatabaseError(
                format!("Failed to recycle connection: {}", e),
            ))),
        }
    }
}

pub type SurrealPool = managed::Pool<SurrealConnectionManager>;

#[derive(Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub create_timeout: Duration,
    pub recycle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            create_timeout: Duration::from_secs(30),
            recycle_timeout: Some(Duration::from_secs(10)),
        }
    }
}

pub fn create_pool(
    connection_config: SurrealConnectionConfig,
    pool_config: PoolConfig,
) -> Result<SurrealPool, ServerError> {
    let manager = SurrealConnectionManager::new(connection_config);

    managed::Pool::builder(manager)
        .max_size(pool_config.max_size)
        .runtime(Runtime::Tokio1)
        .create_timeout(Some(pool_config.create_timeout))
        .recycle_timeout(pool_config.recycle_timeout)
        .build()
        .map_err(|e| ServerError::DatabaseError(format!("Failed to create connection pool: {}", e)))
}
