use std::{net::SocketAddr, sync::Arc, time::Instant};

use tokio::sync::mpsc::{self, error::TrySendError};

// ── Connected client ─────────────────────────────────────────────────────────

/// A serialized frame shared by every client queue it is pushed into.
pub type Frame = Arc<str>;

/// An overlay connected to the relay.
///
/// The hub only ever holds the sending half of the client's bounded queue;
/// the connection's write loop owns the receiver and the socket.
#[derive(Debug)]
pub struct ConnectedClient {
    pub conn_id: String,
    pub remote_addr: Option<SocketAddr>,
    pub connected_at: Instant,
    sender: mpsc::Sender<Frame>,
}

/// Result of queueing a frame for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    /// The client's queue is full. It is not keeping up.
    Lagging,
    /// The write loop is gone.
    Closed,
}

impl ConnectedClient {
    /// Create a client and the receiving half its write loop drains.
    pub fn new(
        conn_id: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let client = Self {
            conn_id: conn_id.into(),
            remote_addr,
            connected_at: Instant::now(),
            sender,
        };
        (client, receiver)
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: &Frame) -> SendOutcome {
        match self.sender.try_send(Arc::clone(frame)) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => SendOutcome::Lagging,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }
}
