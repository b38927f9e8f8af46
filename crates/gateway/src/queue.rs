//! Inbound event queue between the chat source and the relay hub.
//!
//! Producers (the Discord event loop, slash commands) enqueue without
//! waiting. A single drain task applies events to the hub strictly in
//! arrival order, so a paced replay delays later live messages.

use std::sync::Arc;

use {
    chatcast_protocol::CanonicalMessage,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::hub::RelayHub;

/// Work for the relay hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A live message: append and broadcast.
    Message(CanonicalMessage),
    /// Replace history silently (startup seed, channel removed).
    Reload(Vec<CanonicalMessage>),
    /// Replace history and stream the new entries (channel added).
    Replay(Vec<CanonicalMessage>),
}

impl InboundEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Reload(_) => "reload",
            Self::Replay(_) => "replay",
        }
    }
}

/// Cloneable producer handle.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl InboundSender {
    /// Enqueue an event. Returns `false` once the drain task has stopped.
    pub fn send(&self, event: InboundEvent) -> bool {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!(kind, "inbound queue closed, event discarded");
                false
            },
        }
    }
}

pub type InboundReceiver = mpsc::UnboundedReceiver<InboundEvent>;

pub fn inbound_channel() -> (InboundSender, InboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboundSender { tx }, rx)
}

/// Apply queued events to `hub` until every sender is dropped or `cancel`
/// fires.
pub async fn run_drain(hub: Arc<RelayHub>, mut rx: InboundReceiver, cancel: CancellationToken) {
    info!("inbound drain started");
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        debug!(kind = event.kind(), "applying inbound event");

        let result = match event {
            InboundEvent::Message(message) => hub.publish(message).await,
            InboundEvent::Reload(messages) => {
                hub.reload(messages).await;
                Ok(())
            },
            InboundEvent::Replay(messages) => hub.replay(messages, &cancel).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to apply inbound event");
        }
    }
    info!("inbound drain stopped");
}
