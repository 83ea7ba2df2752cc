use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::definitions::Identity;

/// Notifications emitted by the connection request service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A peer delivered a connection request; it is still encrypted
    RequestReceived { sender: Identity, request_id: Uuid },
    /// The owner accepted a pending request from `sender`
    RequestAccepted { sender: Identity },
    /// A peer accepted a request we sent; the connection is recorded
    ConnectionAccepted { recipient: Identity },
    /// The peer confirmed it recorded the connection on its side
    ConnectionFinalized { peer: Identity },
}

/// Fire and forget event sink
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: ConnectionEvent);
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: ConnectionEvent) {
        tracing::trace!(?event, "dropping event");
    }
}

/// Forwards events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: ConnectionEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::warn!("event receiver is gone, dropping {:?}", e.0);
        }
    }
}
