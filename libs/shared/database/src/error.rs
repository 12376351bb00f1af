use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed data: {0}")]
    Decode(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Subscription closed")]
    SubscriptionClosed,
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlobError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Blob store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob reference: {0}")]
    InvalidReference(String),
}

impl From<reqwest::Error> for BlobError {
    fn from(err: reqwest::Error) -> Self {
        BlobError::Network(err.to_string())
    }
}
