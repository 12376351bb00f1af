use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("Notification service not configured")]
    NotConfigured,

    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}
