use crate::github::GitHubConfig;
use crate::pool::PoolConfig;
use crate::store::SurrealConnectionConfig;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "star-neighbours-server")]
#[command(about = "Star Neighbours Server - Finds repositories sharing stargazers with a GitHub repository")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to bind the API to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the API to
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// GitHub token, raises the upstream rate limit when set
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Timeout for each GitHub request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 60)]
    pub request_timeout: u64,

    /// Starred-list requests kept in flight per lookup (1 = sequential)
    #[arg(long, env = "UPSTREAM_CONCURRENCY", default_value_t = 4)]
    pub upstream_concurrency: usize,

    /// Secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime, in minutes
    #[arg(long, env = "TOKEN_TTL_MINUTES", default_value_t = 30)]
    pub token_ttl_minutes: i64,

    /// SurrealDB connection URL
    #[arg(long, env = "DB_URL", default_value = "mem://")]
    pub db_url: String,

    /// SurrealDB root username
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// SurrealDB root password
    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    /// SurrealDB namespace
    #[arg(long, env = "DB_NAMESPACE", default_value = "stargazer")]
    pub db_namespace: String,

    /// SurrealDB database
    #[arg(long, env = "DB_DATABASE", default_value = "users")]
    pub db_database: String,

    /// Users created at startup when missing, as `username:password` pairs
    #[arg(long, env = "SEED_USERS", value_delimiter = ',', hide_env_values = true)]
    pub seed_users: Vec<String>,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_POOL_MAX_SIZE", default_value_t = 10)]
    pub db_pool_max_size: usize,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API (default)
    Serve,

    /// Add a user allowed to request access tokens
    AddUser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// Defaults to <username>@stargazer.com
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        full_name: Option<String>,
    },
}

impl Cli {
    /// Parsed `--seed-users` entries, skipping any without a password
    pub fn seed_credentials(&self) -> Vec<(String, String)> {
        self.seed_users
            .iter()
            .filter_map(|entry| entry.split_once(':'))
            .filter(|(username, password)| !username.is_empty() && !password.is_empty())
            .map(|(username, password)| (username.to_string(), password.to_string()))
            .collect()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            base_url: self.github_api_url.clone(),
            token: self.github_token.clone(),
            timeout: Duration::from_secs(self.request_timeout),
        }
    }

    pub fn connection_config(&self) -> SurrealConnectionConfig {
        SurrealConnectionConfig {
            url: self.db_url.clone(),
            username: self.db_user.clone(),
            password: self.db_pass.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_size: self.db_pool_max_size,
            ..Default::default()
        }
    }
}
