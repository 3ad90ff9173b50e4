//! Background data refresh system
//!
//! Runs refreshes on a tokio task so the UI loop keeps drawing while a fetch
//! is in flight, and reports the outcome back over a channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::pipeline::{Dataset, LoadError, Loader};

/// Messages sent from background refresh to main app
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// Refresh started fetching
    Started,
    /// Fresh dataset is ready
    Completed(Dataset),
    /// Both sources failed; carries the user-facing notice
    Failed(String),
    /// Another load was still running, nothing was done
    Busy,
}

/// Handle for controlling the background refresh system
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Channel for requesting an immediate refresh
    request_tx: mpsc::Sender<()>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Creates a new RefreshHandle and spawns the refresh worker
    ///
    /// # Arguments
    /// * `loader` - Loader shared with the app
    ///
    /// # Returns
    /// A RefreshHandle that receives updates via the `receiver` channel
    pub fn spawn(loader: Arc<Loader>) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (request_tx, mut request_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            // Refreshes run only when requested
            loop {
                tokio::select! {
                    Some(()) = request_rx.recv() => {}
                    _ = shutdown_rx.recv() => break,
                }

                let message = run_refresh(&loader, &msg_tx).await;
                if msg_tx.send(message).await.is_err() {
                    break;
                }
            }
            debug!("Refresh worker stopped");
        });

        Self {
            receiver: msg_rx,
            request_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate refresh
    ///
    /// Returns `false` if a request is already queued.
    pub fn request_refresh(&self) -> bool {
        self.request_tx.try_send(()).is_ok()
    }

    /// Shuts down the background refresh task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn run_refresh(loader: &Loader, msg_tx: &mpsc::Sender<RefreshMessage>) -> RefreshMessage {
    let cycle = match loader.begin() {
        Ok(cycle) => cycle,
        Err(_) => return RefreshMessage::Busy,
    };
    let _ = msg_tx.send(RefreshMessage::Started).await;

    match cycle.fetch().await {
        Ok(dataset) => RefreshMessage::Completed(dataset),
        Err(LoadError::Busy) => RefreshMessage::Busy,
        Err(e) => RefreshMessage::Failed(format!("Could not load water sources: {}", e)),
    }
}

/// Checks for pending refresh messages without blocking
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}
