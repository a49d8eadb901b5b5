use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error("invalid batch request: {0}")]
    InvalidRequest(String),
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Config(Vec<String>),
    #[error("price history request for {region} failed with status {status}: {body}")]
    Api {
        region: String,
        status: u16,
        body: String,
    },
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("price stream closed before all samples were delivered")]
    StreamClosed,
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn invalid_request<T: Into<String>>(msg: T) -> Self {
        AppError::InvalidRequest(msg.into())
    }

    /// True for errors that only exist because some other failure (or the caller) cancelled the batch.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}
