//! Remote toggle transport abstraction.

use crate::queue::ToggleSender;
use crate::types::RemoteToggle;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Abstraction for an external pub/sub channel carrying boolean toggles.
///
/// # Implementations
///
/// - **Production**: a middleware subscriber on the two trace topics
/// - **Simulation**: [`LoopbackTransport`], fed by the scenario script
///
/// # Message Flow
///
/// ```text
/// Publisher            Transport            Bridge task           Frame thread
///    |-- (topic, b) ------->|                    |                      |
///    |                      |-- recv() --------->|                      |
///    |                      |                    |-- ToggleCommand ---->| (drained next frame)
/// ```
#[async_trait]
pub trait ToggleTransport: Send + Sync + 'static {
    /// Receives the next remote message.
    ///
    /// # Returns
    /// * `Some(msg)` - A message was received
    /// * `None` - The transport was shut down
    async fn recv(&self) -> Option<RemoteToggle>;
}

/// Spawns a task that forwards remote messages into the toggle queue.
///
/// Messages on unknown topics are dropped. The task ends when the transport
/// shuts down or the frame-side receiver is gone.
pub fn spawn_remote_bridge<T: ToggleTransport>(
    transport: Arc<T>,
    sender: ToggleSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = transport.recv().await {
            let command = match msg.command() {
                Ok(command) => command,
                Err(e) => {
                    debug!("Ignoring remote toggle: {}", e);
                    continue;
                }
            };
            if sender.send(command).await.is_err() {
                debug!("Toggle queue closed, stopping remote bridge");
                break;
            }
        }
    })
}

/// In-process transport backed by a tokio channel.
pub struct LoopbackTransport {
    rx: Mutex<mpsc::Receiver<RemoteToggle>>,
}

/// Publishing half of a [`LoopbackTransport`].
#[derive(Debug, Clone)]
pub struct LoopbackPublisher {
    tx: mpsc::Sender<RemoteToggle>,
}

impl LoopbackTransport {
    /// Creates a transport and its publisher.
    pub fn new(capacity: usize) -> (LoopbackPublisher, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            LoopbackPublisher { tx },
            Self {
                rx: Mutex::new(rx),
            },
        )
    }
}

impl LoopbackPublisher {
    /// Publishes a boolean on a topic. Returns false if the transport is gone.
    pub async fn publish(&self, topic: &str, value: bool) -> bool {
        self.tx.send(RemoteToggle::new(topic, value)).await.is_ok()
    }
}

#[async_trait]
impl ToggleTransport for LoopbackTransport {
    async fn recv(&self) -> Option<RemoteToggle> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::toggle_queue;
    use crate::types::{ToggleCommand, COLLECT_TOPIC, VISIBLE_TOPIC};

    #[tokio::test]
    async fn test_bridge_forwards_known_topics() {
        let (publisher, transport) = LoopbackTransport::new(8);
        let (tx, mut rx) = toggle_queue(8);
        let bridge = spawn_remote_bridge(Arc::new(transport), tx);

        assert!(publisher.publish(COLLECT_TOPIC, true).await);
        assert!(publisher.publish("some/other/topic", true).await);
        assert!(publisher.publish(VISIBLE_TOPIC, true).await);
        drop(publisher);

        bridge.await.unwrap();

        assert_eq!(
            rx.drain(),
            vec![ToggleCommand::SetCollect(true), ToggleCommand::SetShow(true)]
        );
    }

    #[tokio::test]
    async fn test_bridge_stops_when_receiver_dropped() {
        let (publisher, transport) = LoopbackTransport::new(8);
        let (tx, rx) = toggle_queue(1);
        drop(rx);
        let bridge = spawn_remote_bridge(Arc::new(transport), tx);

        publisher.publish(COLLECT_TOPIC, true).await;
        bridge.await.unwrap();
        assert!(!publisher.publish(COLLECT_TOPIC, false).await);
    }
}
