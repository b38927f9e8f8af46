//! Relay hub: the message history plus the set of connected overlays.
//!
//! Lock order is always `history` then `clients`. A new client receives its
//! init snapshot and joins the client set while the history read lock is
//! held, and every mutation fans out while the history write lock is held,
//! so each message reaches a client exactly once: either inside its init
//! snapshot or as a later `new` frame, never both and never neither.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    num::NonZeroUsize,
    sync::Arc,
    time::Duration,
};

use {
    chatcast_protocol::{
        CLIENT_QUEUE_CAPACITY, CanonicalMessage, DEFAULT_MAX_MESSAGES, FontAsset,
        REPLAY_INTERVAL_MS, SEND_TIMEOUT_MS, ServerFrame,
    },
    tokio::sync::{RwLock, mpsc},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    broadcast::fan_out,
    error::{Error, Result},
    history::{HistoryBuffer, most_recent},
    state::{ConnectedClient, Frame, SendOutcome},
};

/// Tunables for a [`RelayHub`].
#[derive(Debug, Clone)]
pub struct HubOptions {
    pub max_messages: NonZeroUsize,
    /// Pause between frames while replaying a newly watched channel.
    pub replay_interval: Duration,
    /// Upper bound on a single socket write before the client is dropped.
    pub send_timeout: Duration,
    /// Frames a client may have queued before it counts as lagging.
    pub client_queue_capacity: usize,
}

impl HubOptions {
    /// Options with the given history capacity. Zero is rejected.
    pub fn with_max_messages(max_messages: usize) -> Result<Self> {
        let max_messages = NonZeroUsize::new(max_messages).ok_or(Error::ZeroCapacity)?;
        Ok(Self {
            max_messages,
            ..Self::default()
        })
    }
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            max_messages: NonZeroUsize::new(DEFAULT_MAX_MESSAGES).unwrap_or(NonZeroUsize::MIN),
            replay_interval: Duration::from_millis(REPLAY_INTERVAL_MS),
            send_timeout: Duration::from_millis(SEND_TIMEOUT_MS),
            client_queue_capacity: CLIENT_QUEUE_CAPACITY,
        }
    }
}

/// A freshly registered client: its id and the queue its write loop drains.
/// The init frame is already queued.
#[derive(Debug)]
pub struct ClientSession {
    pub conn_id: String,
    pub frames: mpsc::Receiver<Frame>,
}

pub struct RelayHub {
    history: RwLock<HistoryBuffer>,
    clients: RwLock<HashMap<String, ConnectedClient>>,
    fonts: Vec<FontAsset>,
    options: HubOptions,
}

impl RelayHub {
    pub fn new(options: HubOptions, fonts: Vec<FontAsset>) -> Arc<Self> {
        Arc::new(Self {
            history: RwLock::new(HistoryBuffer::new(options.max_messages)),
            clients: RwLock::new(HashMap::new()),
            fonts,
            options,
        })
    }

    pub fn options(&self) -> &HubOptions {
        &self.options
    }

    // ── Clients ──────────────────────────────────────────────────────────

    /// Register a new overlay. Its queue starts with the init frame (current
    /// history plus fonts) and no `new` frame can precede it.
    pub async fn connect(&self, remote_addr: Option<SocketAddr>) -> Result<ClientSession> {
        let conn_id = uuid::Uuid::new_v4().to_string();
        let (client, frames) = ConnectedClient::new(
            conn_id.clone(),
            remote_addr,
            self.options.client_queue_capacity,
        );

        let history = self.history.read().await;
        let buffered = history.len();
        let init = ServerFrame::init(history.snapshot(), self.fonts.clone());
        let frame: Frame = serde_json::to_string(&init)?.into();
        if client.send(&frame) != SendOutcome::Queued {
            return Err(Error::ClientGone(conn_id));
        }

        let mut clients = self.clients.write().await;
        clients.insert(conn_id.clone(), client);
        let total = clients.len();
        drop(clients);
        drop(history);

        info!(
            conn_id = %conn_id,
            remote = ?remote_addr,
            history = buffered,
            clients = total,
            "client connected"
        );
        Ok(ClientSession { conn_id, frames })
    }

    /// Remove a client. Unknown ids are ignored, so calling this twice is
    /// harmless.
    pub async fn unregister(&self, conn_id: &str) -> Option<ConnectedClient> {
        let removed = self.clients.write().await.remove(conn_id);
        if let Some(client) = &removed {
            info!(
                conn_id = %conn_id,
                remote = ?client.remote_addr,
                duration_secs = client.connected_at.elapsed().as_secs(),
                "client disconnected"
            );
        }
        removed
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn drop_clients(&self, dead: Vec<String>) {
        if dead.is_empty() {
            return;
        }
        let mut clients = self.clients.write().await;
        for conn_id in dead {
            if clients.remove(&conn_id).is_some() {
                info!(conn_id = %conn_id, "client removed after failed send");
            }
        }
    }

    // ── History ──────────────────────────────────────────────────────────

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn snapshot(&self) -> Vec<CanonicalMessage> {
        self.history.read().await.snapshot()
    }

    /// Append a live message and send it to every client.
    pub async fn publish(&self, message: CanonicalMessage) -> Result<()> {
        let frame = new_frame(&message)?;
        let mut history = self.history.write().await;
        history.append(message);
        let dead = fan_out(&*self.clients.read().await, &frame);
        drop(history);
        self.drop_clients(dead).await;
        Ok(())
    }

    /// Replace the history without notifying clients. Overlays see the new
    /// contents on their next connect.
    pub async fn reload(&self, messages: Vec<CanonicalMessage>) {
        let mut history = self.history.write().await;
        history.replace_all(messages);
        debug!(history = history.len(), "history reloaded");
    }

    /// Replace the history with `messages` and stream the entries that were
    /// not already buffered to clients as `new` frames, oldest first, paced
    /// by `replay_interval`.
    ///
    /// The resulting history equals [`RelayHub::reload`] with the same input:
    /// each step shows the part of the final order revealed so far, so equal
    /// timestamps keep their batch order. Pacing is skipped when nobody is
    /// connected or `cancel` fires.
    pub async fn replay(
        &self,
        messages: Vec<CanonicalMessage>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let target = most_recent(messages, self.options.max_messages);
        let (mut revealed, pending) = {
            let mut history = self.history.write().await;
            let revealed: HashSet<String> = target
                .iter()
                .filter(|m| history.contains_id(&m.id))
                .map(|m| m.id.clone())
                .collect();
            history.replace_all(revealed_part(&target, &revealed));
            let pending: Vec<CanonicalMessage> = target
                .iter()
                .filter(|m| !revealed.contains(&m.id))
                .cloned()
                .collect();
            (revealed, pending)
        };

        let pace = self.client_count().await > 0;
        info!(count = pending.len(), paced = pace, "replaying messages");

        let mut streamed = 0usize;
        for message in pending {
            // Repeated ids in the batch are streamed once.
            if !revealed.insert(message.id.clone()) {
                continue;
            }
            if pace && streamed > 0 && !cancel.is_cancelled() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("replay pacing cancelled");
                    },
                    _ = tokio::time::sleep(self.options.replay_interval) => {},
                }
            }
            self.reveal_and_broadcast(&message, revealed_part(&target, &revealed))
                .await?;
            streamed += 1;
        }
        Ok(())
    }

    async fn reveal_and_broadcast(
        &self,
        message: &CanonicalMessage,
        visible: Vec<CanonicalMessage>,
    ) -> Result<()> {
        let frame = new_frame(message)?;
        let mut history = self.history.write().await;
        history.replace_all(visible);
        let dead = fan_out(&*self.clients.read().await, &frame);
        drop(history);
        self.drop_clients(dead).await;
        Ok(())
    }
}

/// Entries of `target` whose id is in `revealed`, in `target` order.
fn revealed_part(
    target: &[CanonicalMessage],
    revealed: &HashSet<String>,
) -> Vec<CanonicalMessage> {
    target
        .iter()
        .filter(|m| revealed.contains(&m.id))
        .cloned()
        .collect()
}

fn new_frame(message: &CanonicalMessage) -> Result<Frame> {
    let json = serde_json::to_string(&ServerFrame::new_message(message.clone()))?;
    Ok(json.into())
}
