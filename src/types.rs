use serde::Deserialize;

// GitHub API response structures, reduced to the fields the lookup reads
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubStarredRepo {
    pub full_name: String,
}

/// Rate limit budget reported by the last GitHub response
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: Option<i64>,
}

impl RateLimitState {
    pub fn is_low(&self) -> bool {
        self.remaining < 10
    }
}
