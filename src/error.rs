use thiserror::Error;

/// Errors produced by the coders and their supporting plumbing.
///
/// Algorithmic degeneracies (an LPC signal with no energy, an arithmetic
/// value sitting on an interval boundary) are not errors; they are absorbed
/// by the coder and reported through metadata or the log. Only structural
/// and resource failures surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown coder: {0}")]
    UnknownCoder(String),

    #[error("bundle was produced by '{found}', expected '{expected}'")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("malformed video stream: {0}")]
    MalformedStream(String),

    #[error("invalid decimal literal: {0}")]
    ParseDecimal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

/// Result type for coding operations
pub type Result<T> = std::result::Result<T, Error>;
