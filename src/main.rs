use anyhow::Context;
use clap::Parser;
use colored::*;
use star_neighbours_server::api::{start_server, AppState};
use star_neighbours_server::auth::{hash_password, TokenKeys};
use star_neighbours_server::cli::{Cli, Command};
use star_neighbours_server::error::StarNeighboursError;
use star_neighbours_server::github::GitHubClient;
use star_neighbours_server::pool::create_pool;
use star_neighbours_server::store::{SurrealUserStore, User, UserStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let mut cli = Cli::parse();

    let db_pool = Arc::new(create_pool(cli.connection_config(), cli.pool_config())?);

    // Make sure the user table exists before anything reads it
    db_pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))?
        .define_schema()
        .await?;

    let users = Arc::new(SurrealUserStore::new(db_pool.clone()));

    match cli.command.take() {
        Some(Command::AddUser { username, password, email, full_name }) => {
            let mut user = User::seeded(&username, hash_password(&password)?);
            if let Some(email) = email {
                user.email = email;
            }
            if full_name.is_some() {
                user.full_name = full_name;
            }
            users.insert_user(user).await?;
            println!("{} {}", "✅ Added user".green(), username.bold());
            if cli.db_url.starts_with("mem://") {
                println!("{}", "DB_URL points at an in-memory database, the user is gone once this process exits".yellow());
            }
            Ok(())
        }
        Some(Command::Serve) | None => serve(cli, users).await,
    }
}

async fn serve(cli: Cli, users: Arc<SurrealUserStore>) -> anyhow::Result<()> {
    println!("{}", "Star Neighbours Server".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let secret = cli
        .jwt_secret
        .clone()
        .ok_or_else(|| StarNeighboursError::EnvError("JWT_SECRET must be set to serve the API".to_string()))?;

    for (username, password) in cli.seed_credentials() {
        if users.get_user(&username).await?.is_some() {
            continue;
        }
        users.insert_user(User::seeded(&username, hash_password(&password)?)).await?;
        println!("👤 Seeded user {}", username.bold());
    }

    let github = GitHubClient::new(cli.github_config())?;
    if cli.github_token.is_none() {
        println!("{}", "No GITHUB_TOKEN set, GitHub allows 60 unauthenticated requests per hour".yellow());
    }

    let state = AppState {
        stars: Arc::new(github),
        users,
        tokens: TokenKeys::new(&secret, chrono::Duration::minutes(cli.token_ttl_minutes)),
        upstream_concurrency: cli.upstream_concurrency,
    };

    let addr = cli.bind_addr().context("Invalid bind address")?;
    info!(github_api = %cli.github_api_url, concurrency = cli.upstream_concurrency, "Starting API");
    println!("📡 Listening on http://{}", addr);
    println!("\nPress Ctrl+C to stop the server\n");

    start_server(state, addr, async {
        tokio::signal::ctrl_c().await.ok();
        println!("\n🛑 Shutting down server...");
    })
    .await?;

    println!("✅ Server stopped");
    Ok(())
}
