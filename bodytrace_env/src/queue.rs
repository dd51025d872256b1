//! Single-writer hand-off of toggle commands to the frame thread.
//!
//! Remote channels deliver toggles asynchronously relative to the frame
//! loop. Commands are queued here and drained by the frame thread at the
//! start of a frame, so every toggle is applied atomically with respect to
//! a frame tick.

use crate::error::EnvError;
use crate::types::ToggleCommand;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Creates a bounded toggle queue.
///
/// A capacity of zero is bumped to one.
pub fn toggle_queue(capacity: usize) -> (ToggleSender, ToggleReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ToggleSender { tx }, ToggleReceiver { rx })
}

/// Producer side of the toggle queue. Cheap to clone, usable from any task.
#[derive(Debug, Clone)]
pub struct ToggleSender {
    tx: mpsc::Sender<ToggleCommand>,
}

impl ToggleSender {
    /// Queues a command, waiting for capacity if the queue is full.
    pub async fn send(&self, command: ToggleCommand) -> Result<(), EnvError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| EnvError::ChannelClosed)
    }

    /// Queues a command without waiting.
    pub fn try_send(&self, command: ToggleCommand) -> Result<(), EnvError> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => EnvError::QueueFull,
            TrySendError::Closed(_) => EnvError::ChannelClosed,
        })
    }

    /// Returns true once the frame-side receiver is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the toggle queue, owned by the frame thread.
#[derive(Debug)]
pub struct ToggleReceiver {
    rx: mpsc::Receiver<ToggleCommand>,
}

impl ToggleReceiver {
    /// Returns the next pending command without blocking.
    pub fn try_next(&mut self) -> Option<ToggleCommand> {
        self.rx.try_recv().ok()
    }

    /// Takes every pending command, in arrival order.
    pub fn drain(&mut self) -> Vec<ToggleCommand> {
        let mut pending = Vec::new();
        while let Some(command) = self.try_next() {
            pending.push(command);
        }
        pending
    }
}
