use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::HierarchicalStore;

/// Live view of one subtree, refreshed by polling the store.
///
/// The polling task lives exactly as long as the handle: `unsubscribe` or
/// dropping the handle stops it. Failed polls keep the last good snapshot.
pub struct Subscription {
    path: String,
    receiver: watch::Receiver<Option<Value>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn spawn(store: Arc<dyn HierarchicalStore>, path: impl Into<String>, interval: Duration) -> Self {
        let path = path.into();
        let (sender, receiver) = watch::channel(None);
        let poll_path = path.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if sender.is_closed() {
                    break;
                }

                match store.read(&poll_path).await {
                    Ok(snapshot) => {
                        let changed = sender.send_if_modified(|current| {
                            if *current != snapshot {
                                *current = snapshot;
                                true
                            } else {
                                false
                            }
                        });
                        if changed {
                            debug!("Subscription on '{}' observed a change", poll_path);
                        }
                    }
                    Err(e) => warn!("Polling '{}' failed: {}", poll_path, e),
                }
            }
        });

        debug!("Subscribed to '{}'", path);
        Self { path, receiver, task }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Most recent snapshot seen, `None` until the first successful poll
    /// finds data.
    pub fn latest(&self) -> Option<Value> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change and return the new snapshot.
    pub async fn changed(&mut self) -> Result<Option<Value>, StoreError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StoreError::SubscriptionClosed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        debug!("Unsubscribed from '{}'", self.path);
        // Drop aborts the polling task.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
