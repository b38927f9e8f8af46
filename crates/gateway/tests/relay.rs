#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests for the relay listener: real sockets, real frames.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    chrono::{TimeZone, Utc},
    futures::{SinkExt, StreamExt},
    tokio::task::JoinHandle,
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
};

use {
    chatcast_gateway::{HubOptions, RelayHub, bind_relay, serve_relay},
    chatcast_protocol::{CanonicalMessage, FontAsset},
};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

struct TestRelay {
    addr: SocketAddr,
    hub: Arc<RelayHub>,
    shutdown: CancellationToken,
    server: JoinHandle<chatcast_gateway::Result<()>>,
}

/// Spin up a relay on an ephemeral port.
async fn start_test_relay(max_messages: usize) -> TestRelay {
    let fonts = vec![FontAsset {
        name: "overlay.woff2".into(),
        base64_data: "d09GMg==".into(),
        format: "woff2".into(),
        mime_type: "font/woff2".into(),
    }];
    let hub = RelayHub::new(HubOptions::with_max_messages(max_messages).unwrap(), fonts);
    let shutdown = CancellationToken::new();
    let listener = bind_relay("127.0.0.1", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_relay(listener, Arc::clone(&hub), shutdown.clone()));
    TestRelay {
        addr,
        hub,
        shutdown,
        server,
    }
}

fn msg(id: &str, t: i64) -> CanonicalMessage {
    CanonicalMessage {
        id: id.into(),
        channel_name: "stream-chat".into(),
        author_display_name: "viewer".into(),
        author_avatar_url: "https://cdn.example/avatar.png".into(),
        content: format!("hello {id}"),
        attachments: Vec::new(),
        embeds: Vec::new(),
        timestamp: Utc.timestamp_opt(t, 0).unwrap(),
    }
}

async fn next_json(ws: &mut Client) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for frame")
        .unwrap()
        .unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

async fn wait_for_clients(hub: &RelayHub, expected: usize) {
    for _ in 0..100 {
        if hub.client_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("client count never reached {expected}");
}

#[tokio::test]
async fn health_endpoint_reports_counts() {
    let relay = start_test_relay(5).await;
    relay.hub.publish(msg("a", 1)).await.unwrap();

    let resp = reqwest::get(format!("http://{}/health", relay.addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["clients"], 0);
    assert_eq!(json["history"], 1);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn plain_http_on_root_gets_a_hint() {
    let relay = start_test_relay(5).await;
    let resp = reqwest::get(format!("http://{}/", relay.addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("WebSocket"));
}

#[tokio::test]
async fn overlay_gets_init_then_new_frames() {
    let relay = start_test_relay(5).await;
    relay.hub.publish(msg("before", 1)).await.unwrap();

    let (mut ws, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .expect("ws connect failed");

    let init = next_json(&mut ws).await;
    assert_eq!(init["type"], "init");
    assert_eq!(init["messages"].as_array().unwrap().len(), 1);
    assert_eq!(init["messages"][0]["id"], "before");
    assert_eq!(init["messages"][0]["author"], "viewer");
    assert_eq!(init["fonts"][0]["name"], "overlay.woff2");
    assert_eq!(init["fonts"][0]["base64Data"], "d09GMg==");

    relay.hub.publish(msg("after", 2)).await.unwrap();
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "new");
    assert_eq!(frame["message"]["id"], "after");
    assert_eq!(frame["message"]["content"], "hello after");

    ws.close(None).await.ok();
}

#[tokio::test]
async fn root_path_accepts_websocket_upgrades() {
    let relay = start_test_relay(2).await;
    for (i, id) in ["a", "b", "c"].iter().enumerate() {
        relay.hub.publish(msg(id, i as i64)).await.unwrap();
    }

    let (mut ws, _) = connect_async(format!("ws://{}", relay.addr))
        .await
        .expect("ws connect failed");

    let init = next_json(&mut ws).await;
    let ids: Vec<&str> = init["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["b", "c"]);
}

#[tokio::test]
async fn inbound_payloads_are_ignored() {
    let relay = start_test_relay(5).await;
    let (mut ws, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .unwrap();
    next_json(&mut ws).await;

    ws.send(Message::Text(String::from("{\"type\":\"bogus\"}").into()))
        .await
        .unwrap();
    relay.hub.publish(msg("m", 1)).await.unwrap();

    let frame = next_json(&mut ws).await;
    assert_eq!(frame["message"]["id"], "m");
    assert_eq!(relay.hub.client_count().await, 1);
}

#[tokio::test]
async fn closed_overlay_is_unregistered() {
    let relay = start_test_relay(5).await;
    let (mut ws, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .unwrap();
    next_json(&mut ws).await;
    assert_eq!(relay.hub.client_count().await, 1);

    ws.close(None).await.unwrap();
    drop(ws);

    wait_for_clients(&relay.hub, 0).await;
}

#[tokio::test]
async fn one_closed_overlay_does_not_affect_another() {
    let relay = start_test_relay(5).await;
    let (mut gone, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .unwrap();
    let (mut stays, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .unwrap();
    next_json(&mut gone).await;
    next_json(&mut stays).await;

    gone.close(None).await.unwrap();
    drop(gone);
    wait_for_clients(&relay.hub, 1).await;

    relay.hub.publish(msg("still-here", 1)).await.unwrap();
    let frame = next_json(&mut stays).await;
    assert_eq!(frame["message"]["id"], "still-here");
}

#[tokio::test]
async fn shutdown_stops_server_and_closes_overlays() {
    let relay = start_test_relay(5).await;
    let (mut ws, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .unwrap();
    next_json(&mut ws).await;

    relay.shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), relay.server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    // The socket ends (close frame, error, or EOF) instead of hanging.
    let end = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(end.is_ok());
    wait_for_clients(&relay.hub, 0).await;
}

#[tokio::test]
async fn bind_failure_names_the_address() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let err = bind_relay("127.0.0.1", port).await.unwrap_err();
    assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
}
