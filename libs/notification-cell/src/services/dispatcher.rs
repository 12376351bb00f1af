use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::models::Notification;

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Send without waiting for the outcome. At most one attempt; a failure is
/// logged and never reaches the caller.
pub fn dispatch_in_background(
    dispatcher: Arc<dyn NotificationDispatcher>,
    notification: Notification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match dispatcher.send(&notification).await {
            Ok(()) => debug!("Notification '{}' sent", notification.template),
            Err(e) => warn!("Notification '{}' failed: {}", notification.template, e),
        }
    })
}

/// Dispatcher that keeps every notification it is asked to send. Can be told
/// to fail so callers' best-effort handling can be exercised.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Wait until at least `count` notifications were attempted, up to two
    /// seconds.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..200 {
            let sent = self.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent().await
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().await.push(notification.clone());
        if self.fail {
            Err(NotificationError::Transport("recording dispatcher set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}
