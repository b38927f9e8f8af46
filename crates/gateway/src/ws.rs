use std::{net::SocketAddr, sync::Arc};

use {
    axum::extract::ws::{Message, WebSocket},
    futures::{SinkExt, stream::StreamExt},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::hub::RelayHub;

/// Serve one overlay connection: register with the hub, forward queued
/// frames to the socket, and clean up when either side goes away.
///
/// Inbound payloads are read only to notice close frames and errors.
/// `shutdown` closes the connection when the relay stops.
pub async fn handle_connection(
    socket: WebSocket,
    hub: Arc<RelayHub>,
    remote_addr: SocketAddr,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let session = match hub.connect(Some(remote_addr)).await {
        Ok(session) => session,
        Err(e) => {
            warn!(remote = %remote_addr, error = %e, "ws: failed to register client");
            let _ = ws_tx.close().await;
            return;
        },
    };
    let conn_id = session.conn_id;
    let mut frames = session.frames;

    // Write loop: queued frames to the socket, each send bounded by the
    // hub's send timeout. Ends when the hub drops the client's sender.
    let send_timeout = hub.options().send_timeout;
    let write_conn_id = conn_id.clone();
    let mut write_handle = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let send = ws_tx.send(Message::Text(frame.to_string().into()));
            match tokio::time::timeout(send_timeout, send).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    debug!(conn_id = %write_conn_id, error = %e, "ws: write failed");
                    break;
                },
                Err(_) => {
                    warn!(
                        conn_id = %write_conn_id,
                        timeout_ms = send_timeout.as_millis() as u64,
                        "ws: send timed out, dropping client"
                    );
                    break;
                },
            }
        }
        let _ = ws_tx.close().await;
    });

    // Read loop: overlays never send anything meaningful.
    let read_conn_id = conn_id.clone();
    let read_loop = async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {},
                Err(e) => {
                    debug!(conn_id = %read_conn_id, error = %e, "ws: read error");
                    break;
                },
            }
        }
    };

    tokio::select! {
        _ = read_loop => {
            debug!(conn_id = %conn_id, "ws: peer closed");
        },
        _ = &mut write_handle => {
            debug!(conn_id = %conn_id, "ws: write loop ended");
        },
        _ = shutdown.cancelled() => {
            debug!(conn_id = %conn_id, "ws: relay shutting down");
        },
    }

    // ── Cleanup ──────────────────────────────────────────────────────────

    hub.unregister(&conn_id).await;
    write_handle.abort();
    info!(conn_id = %conn_id, "ws: connection closed");
}
