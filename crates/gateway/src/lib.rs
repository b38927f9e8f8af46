//! Relay core: bounded message history, overlay fan-out, the inbound event
//! queue, and the WebSocket/HTTP listener.
//!
//! Data flow:
//! 1. A chat source pushes [`InboundEvent`]s through an [`InboundSender`]
//! 2. [`run_drain`] applies them to the [`RelayHub`] one at a time
//! 3. The hub updates its history and queues frames for each client
//! 4. Each connection's write loop forwards its queue to the socket
//!
//! A newly connected overlay always receives one `init` frame (history
//! snapshot plus fonts) before any `new` frame.

pub mod broadcast;
pub mod error;
pub mod history;
pub mod hub;
pub mod queue;
pub mod server;
pub mod state;
pub mod ws;

pub use {
    error::{Error, Result},
    history::HistoryBuffer,
    hub::{ClientSession, HubOptions, RelayHub},
    queue::{InboundEvent, InboundReceiver, InboundSender, inbound_channel, run_drain},
    server::{bind_relay, build_relay_app, serve_relay, start_relay},
};
