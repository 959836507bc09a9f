//! In-memory transport for testing and in-process engines.
//!
//! Uses channels for in-process communication. This is the transport the
//! engine's own test suite runs over.
//!
//! # Example
//!
//! ```rust
//! use tinymcp_transport::{MemoryTransport, Transport};
//!
//! let (client_transport, server_transport) = MemoryTransport::pair();
//!
//! assert!(client_transport.is_connected());
//! assert!(server_transport.is_connected());
//! ```

use crate::error::TransportError;
use crate::traits::{Transport, TransportMetadata};
use async_lock::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tinymcp_core::Message;
use tracing::{debug, trace};

/// An in-memory transport using channels.
///
/// Created in connected pairs. Closing either side disconnects both.
pub struct MemoryTransport {
    sender: futures::channel::mpsc::Sender<Message>,
    receiver: Mutex<futures::channel::mpsc::Receiver<Message>>,
    connected: Arc<AtomicBool>,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Create a connected pair of memory transports.
    ///
    /// Messages sent on the first transport are received on the second,
    /// and vice versa.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(32)
    }

    /// Create a connected pair with a specific buffer capacity.
    #[must_use]
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        let (tx1, rx1) = futures::channel::mpsc::channel(capacity);
        let (tx2, rx2) = futures::channel::mpsc::channel(capacity);

        let connected1 = Arc::new(AtomicBool::new(true));
        let connected2 = Arc::clone(&connected1);

        let transport1 = Self {
            sender: tx2,
            receiver: Mutex::new(rx1),
            connected: connected1,
            metadata: TransportMetadata::new("memory")
                .remote_addr("peer-1")
                .local_addr("peer-0")
                .connected_now(),
        };

        let transport2 = Self {
            sender: tx1,
            receiver: Mutex::new(rx2),
            connected: connected2,
            metadata: TransportMetadata::new("memory")
                .remote_addr("peer-0")
                .local_addr("peer-1")
                .connected_now(),
        };

        (transport1, transport2)
    }
}

impl Transport for MemoryTransport {
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), Self::Error> {
        use futures::SinkExt;

        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        trace!(method = msg.method().unwrap_or("(response)"), "Sending message");

        // Clone sender to get a mutable reference
        let mut sender = self.sender.clone();
        sender
            .send(msg)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv(&self) -> Result<Option<Message>, Self::Error> {
        use futures::StreamExt;

        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut receiver = self.receiver.lock().await;
        if let Some(msg) = receiver.next().await {
            trace!(method = msg.method().unwrap_or("(response)"), "Received message");
            Ok(Some(msg))
        } else {
            debug!("Peer dropped its end of the channel");
            self.connected.store(false, Ordering::SeqCst);
            Ok(None)
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        debug!("Closing memory transport");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinymcp_core::protocol::{Notification, Request, RequestId};

    #[tokio::test]
    async fn pair_starts_connected() {
        let (client, server) = MemoryTransport::pair();

        assert!(client.is_connected());
        assert!(server.is_connected());
        assert_eq!(client.metadata().transport_type, "memory");
    }

    #[tokio::test]
    async fn send_receive() {
        let (client, server) = MemoryTransport::pair();

        let request = Request::new("tools/list", RequestId::Number(1));
        client.send(Message::Request(request)).await.unwrap();

        let received = server.recv().await.unwrap().unwrap();
        match received {
            Message::Request(req) => {
                assert_eq!(req.method.as_ref(), "tools/list");
            }
            _ => panic!("Expected request"),
        }
    }

    #[tokio::test]
    async fn bidirectional() {
        let (client, server) = MemoryTransport::pair();

        client
            .send(Message::Notification(Notification::new("client/ping")))
            .await
            .unwrap();
        server
            .send(Message::Notification(Notification::new("server/pong")))
            .await
            .unwrap();

        let from_client = server.recv().await.unwrap().unwrap();
        let from_server = client.recv().await.unwrap().unwrap();

        match from_client {
            Message::Notification(n) => assert_eq!(n.method.as_ref(), "client/ping"),
            _ => panic!("Expected notification"),
        }
        match from_server {
            Message::Notification(n) => assert_eq!(n.method.as_ref(), "server/pong"),
            _ => panic!("Expected notification"),
        }
    }

    #[tokio::test]
    async fn close_disconnects_both_sides() {
        let (client, server) = MemoryTransport::pair();

        client.close().await.unwrap();
        assert!(!client.is_connected());
        assert!(!server.is_connected());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (client, _server) = MemoryTransport::pair();

        client.close().await.unwrap();

        let result = client
            .send(Message::Notification(Notification::new("late")))
            .await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }
}
