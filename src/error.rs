use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, WatchError>;
