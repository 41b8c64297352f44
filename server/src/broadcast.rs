//! Fan-out of payloads to registered clients
//!
//! Every send is best effort. A failed send is logged and leaves the client
//! registered; only an explicit EXIT removes a session.

use crate::registry::{ClientEndpoint, SessionRegistry};
use crate::transport::Transport;
use log::{debug, warn};
use shared::ServerMessage;

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends payloads through the server's single transport
pub struct BroadcastEngine<T> {
    transport: T,
}

impl<T: Transport> BroadcastEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Unicasts a payload. Returns whether the datagram was handed to the network.
    pub async fn send_to(&self, endpoint: ClientEndpoint, payload: &[u8]) -> bool {
        match self.transport.send_to(payload, endpoint).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to send to client {}: {}", endpoint, e);
                false
            }
        }
    }

    /// Sends the payload to every registered client, the sender included.
    ///
    /// Each destination is attempted independently; one unreachable client does not
    /// stop delivery to the rest.
    pub async fn broadcast(&self, registry: &SessionRegistry, payload: &[u8]) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for endpoint in registry.endpoints() {
            if self.send_to(endpoint, payload).await {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        debug!(
            "Broadcast {} bytes: {} delivered, {} failed",
            payload.len(),
            report.delivered,
            report.failed
        );
        report
    }

    /// Tells every client how many users are in the room
    pub async fn broadcast_user_count(&self, registry: &SessionRegistry) -> BroadcastReport {
        let message = ServerMessage::UserCount {
            count: registry.count(),
        };
        self.broadcast(registry, &message.encode()).await
    }
}
