#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use star_neighbours_server::api::{create_router, AppState};
use star_neighbours_server::auth::{hash_password_with_cost, TokenKeys};
use star_neighbours_server::error::{Result, StarNeighboursError};
use star_neighbours_server::github::StarSource;
use star_neighbours_server::store::{User, UserStore};
use star_neighbours_server::types::{GitHubStarredRepo, GitHubUser};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";

/// In-memory star graph that counts the calls made against it
#[derive(Default)]
pub struct MockStarSource {
    stargazers: HashMap<String, Vec<String>>,
    starred: HashMap<String, Vec<String>>,
    failing_logins: HashSet<String>,
    stargazer_calls: AtomicUsize,
    starred_calls: AtomicUsize,
}

impl MockStarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stargazers(mut self, repo: &str, logins: &[&str]) -> Self {
        self.stargazers
            .insert(repo.to_string(), logins.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_starred(mut self, login: &str, repos: &[&str]) -> Self {
        self.starred
            .insert(login.to_string(), repos.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Make `list_starred` fail for `login`
    pub fn failing_for(mut self, login: &str) -> Self {
        self.failing_logins.insert(login.to_string());
        self
    }

    pub fn stargazer_calls(&self) -> usize {
        self.stargazer_calls.load(Ordering::SeqCst)
    }

    pub fn starred_calls(&self) -> usize {
        self.starred_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.stargazer_calls() + self.starred_calls()
    }
}

#[async_trait]
impl StarSource for MockStarSource {
    async fn list_stargazers(&self, owner: &str, repo: &str) -> Result<Vec<GitHubUser>> {
        self.stargazer_calls.fetch_add(1, Ordering::SeqCst);
        let logins = self
            .stargazers
            .get(&format!("{}/{}", owner, repo))
            .ok_or_else(|| StarNeighboursError::NotFound(format!("user {} and repo {}", owner, repo)))?;

        Ok(logins
            .iter()
            .map(|login| GitHubUser { login: login.clone() })
            .collect())
    }

    async fn list_starred(&self, login: &str) -> Result<Vec<GitHubStarredRepo>> {
        self.starred_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_logins.contains(login) {
            return Err(StarNeighboursError::NotFound(format!("user {}", login)));
        }

        Ok(self
            .starred
            .get(login)
            .map(|repos| {
                repos
                    .iter()
                    .map(|full_name| GitHubStarredRepo { full_name: full_name.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// User store kept in a map
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserStore {
    /// Store holding one active user with a cheaply hashed password
    pub fn with_user(username: &str, password: &str) -> Self {
        let store = Self::default();
        let hashed = hash_password_with_cost(password, 4).expect("hash password");
        store
            .users
            .lock()
            .unwrap()
            .insert(username.to_string(), User::seeded(username, hashed));
        store
    }

    pub fn disable(&self, username: &str) {
        if let Some(user) = self.users.lock().unwrap().get_mut(username) {
            user.disabled = true;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(username).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Err(StarNeighboursError::DatabaseError(format!(
                "user {} already exists",
                user.username
            )));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// User store whose backend never answers
pub struct UnreachableUserStore;

#[async_trait]
impl UserStore for UnreachableUserStore {
    async fn get_user(&self, _username: &str) -> Result<Option<User>> {
        Err(StarNeighboursError::DatabaseError("connection refused".to_string()))
    }

    async fn insert_user(&self, _user: User) -> Result<()> {
        Err(StarNeighboursError::DatabaseError("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        Err(StarNeighboursError::DatabaseError("connection refused".to_string()))
    }
}

pub fn test_tokens() -> TokenKeys {
    TokenKeys::new(TEST_SECRET, chrono::Duration::minutes(30))
}

pub fn test_app(stars: Arc<MockStarSource>, users: Arc<MemoryUserStore>) -> Router {
    app_with(stars, users)
}

pub fn app_with(stars: Arc<dyn StarSource>, users: Arc<dyn UserStore>) -> Router {
    create_router(AppState {
        stars,
        users,
        tokens: test_tokens(),
        upstream_concurrency: 4,
    })
}

/// Send one request through the router, returning status and JSON body
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("build request")
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .expect("build request")
}
