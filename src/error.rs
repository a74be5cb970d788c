use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),
}

impl ChartError {
    pub fn transport(message: impl Into<String>) -> Self {
        ChartError::Transport {
            message: message.into(),
        }
    }

    /// Transport failures are the only class the UI offers a retry for.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChartError::Transport { .. })
    }
}

impl From<reqwest::Error> for ChartError {
    fn from(e: reqwest::Error) -> Self {
        ChartError::transport(e.to_string())
    }
}

pub type ChartResult<T> = Result<T, ChartError>;
