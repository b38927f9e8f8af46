use std::collections::HashMap;

use tracing::{debug, warn};

use crate::state::{ConnectedClient, Frame, SendOutcome};

// ── Fan-out ──────────────────────────────────────────────────────────────────

/// Queue `frame` for every client and return the ids of clients that must be
/// dropped (queue full or closed).
///
/// Never waits on a client, so one stalled overlay cannot delay the others.
pub fn fan_out(clients: &HashMap<String, ConnectedClient>, frame: &Frame) -> Vec<String> {
    debug!(clients = clients.len(), bytes = frame.len(), "broadcasting frame");
    let mut dead = Vec::new();
    for (conn_id, client) in clients {
        match client.send(frame) {
            SendOutcome::Queued => {},
            SendOutcome::Lagging => {
                warn!(conn_id = %conn_id, "client queue full, dropping slow client");
                dead.push(conn_id.clone());
            },
            SendOutcome::Closed => {
                debug!(conn_id = %conn_id, "client gone, dropping");
                dead.push(conn_id.clone());
            },
        }
    }
    dead
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::sync::Arc};

    #[test]
    fn failing_clients_do_not_block_healthy_ones() {
        let (healthy, mut healthy_rx) = ConnectedClient::new("ok", None, 8);
        let (closed, closed_rx) = ConnectedClient::new("closed", None, 8);
        let (slow, _slow_rx) = ConnectedClient::new("slow", None, 1);
        drop(closed_rx);

        let mut clients = HashMap::new();
        clients.insert("ok".to_string(), healthy);
        clients.insert("closed".to_string(), closed);
        clients.insert("slow".to_string(), slow);

        let first: Frame = Arc::from("first");
        let second: Frame = Arc::from("second");

        let mut dead = fan_out(&clients, &first);
        assert_eq!(dead, vec!["closed".to_string()]);
        clients.remove("closed");

        dead = fan_out(&clients, &second);
        assert_eq!(dead, vec!["slow".to_string()]);

        assert_eq!(&*healthy_rx.try_recv().unwrap(), "first");
        assert_eq!(&*healthy_rx.try_recv().unwrap(), "second");
    }
}
