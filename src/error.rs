use thiserror::Error;

/// Errors that can occur while talking to the Specimen backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Font load failed for '{family}': {message}")]
    FontLoad { family: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
