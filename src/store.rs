use crate::error::{Result, StarNeighboursError};
use crate::pool::{SurrealConnectionManager, SurrealPool};
use anyhow::Context;
use async_trait::async_trait;
use deadpool::managed::Object;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Account allowed to request access tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    pub hashed_password: String,
}

impl User {
    /// Build a user with the default email and display name given to seeded
    /// accounts
    pub fn seeded(username: &str, hashed_password: String) -> Self {
        Self {
            username: username.to_string(),
            email: format!("{}@stargazer.com", username),
            full_name: Some(format!("{}_{}", username, username)),
            disabled: false,
            hashed_password,
        }
    }
}

/// Credential storage consulted by the login endpoint
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<User>>;

    async fn insert_user(&self, user: User) -> Result<()>;

    /// Cheap round trip used by the readiness check
    async fn ping(&self) -> Result<()>;
}

const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS username ON user TYPE string;
    DEFINE FIELD IF NOT EXISTS email ON user TYPE string;
    DEFINE FIELD IF NOT EXISTS full_name ON user TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS disabled ON user TYPE bool DEFAULT false;
    DEFINE FIELD IF NOT EXISTS hashed_password ON user TYPE string;
    DEFINE INDEX IF NOT EXISTS user_username ON user FIELDS username UNIQUE;
    DEFINE INDEX IF NOT EXISTS user_email ON user FIELDS email UNIQUE;
"#;

#[derive(Clone, Debug)]
pub struct SurrealClient {
    pub db: Surreal<Any>,
}

#[derive(Debug, Clone)]
pub struct SurrealConnectionConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: String,
    pub database: String,
}

impl SurrealConnectionConfig {
    pub fn is_embedded(&self) -> bool {
        self.url.starts_with("mem://") || self.url == "memory"
    }
}

impl SurrealClient {
    /// Connect to SurrealDB. Root credentials are only used when both are
    /// given, so embedded `mem://` databases work without them.
    pub async fn connect(config: &SurrealConnectionConfig) -> anyhow::Result<Self> {
        debug!("Connecting to SurrealDB at {}", config.url);

        let db: Surreal<Any> = Surreal::init();
        db.connect(config.url.as_str()).await.context("Failed to connect to SurrealDB")?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root { username: username.as_str(), password: password.as_str() })
                .await
                .context("Failed to authenticate with SurrealDB")?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context("Failed to select namespace and database")?;

        Ok(Self { db })
    }

    /// Create the user table and its unique indexes if missing
    pub async fn define_schema(&self) -> anyhow::Result<()> {
        self.db
            .query(SCHEMA)
            .await
            .context("Failed to send schema definition")?
            .check()
            .context("Failed to define schema")?;
        info!("User schema ready");
        Ok(())
    }

    pub async fn get_user(&self, username: &str) -> anyhow::Result<Option<User>> {
        let query = r#"
            SELECT username, email, full_name, disabled, hashed_password
            FROM user
            WHERE username = $username
            LIMIT 1
        "#;

        let mut result = self.db.query(query).bind(("username", username.to_string())).await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    pub async fn insert_user(&self, user: User) -> anyhow::Result<()> {
        let username = user.username.clone();
        self.db
            .query("CREATE user CONTENT $user")
            .bind(("user", user))
            .await?
            .check()
            .with_context(|| format!("Failed to create user {}", username))?;
        info!(username = %username, "Created user");
        Ok(())
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db.query("RETURN 1").await?.check()?;
        Ok(())
    }
}

/// `UserStore` over a pool of SurrealDB connections
#[derive(Clone)]
pub struct SurrealUserStore {
    pool: Arc<SurrealPool>,
}

impl SurrealUserStore {
    pub fn new(pool: Arc<SurrealPool>) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<Object<SurrealConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| StarNeighboursError::DatabaseError(
                format!("Failed to get connection from pool: {}", e)
            ))
    }
}

fn database_error(e: anyhow::Error) -> StarNeighboursError {
    StarNeighboursError::DatabaseError(format!("{:#}", e))
}

#[async_trait]
impl UserStore for SurrealUserStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.client().await?.get_user(username).await.map_err(database_error)
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.client().await?.insert_user(user).await.map_err(database_error)
    }

    async fn ping(&self) -> Result<()> {
        self.client().await?.ping().await.map_err(database_error)
    }
}
