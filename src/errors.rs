use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Network Error: {0}")]
    NetworkError(String),
    #[error("LLM Error: {0}")]
    LLMError(String),
    #[error("Configuration Error: {0}")]
    ConfigError(String),
    #[error("Validation Error: {0}")]
    ValidationError(String),
    #[error("Tool Error: {0}")]
    ToolError(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON error: {}", err))
    }
}
