use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarNeighboursError {
    #[error("Nothing found with {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid upstream payload: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid upstream URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment error: {0}")]
    EnvError(String),
}

impl StarNeighboursError {
    /// Failures raised while talking to GitHub. These abort an aggregation
    /// and are reported to the caller as a bad request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            StarNeighboursError::NotFound(_)
                | StarNeighboursError::NetworkError(_)
                | StarNeighboursError::JsonError(_)
                | StarNeighboursError::UrlError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StarNeighboursError>;
