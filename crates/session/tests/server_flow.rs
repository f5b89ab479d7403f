//! Engine against a real WebSocket endpoint: a scripted in-process server
//! accepts the connection and plays both halves of the protocol.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use rentroyale_session::ports::{AnonymousIdentity, LoggingPresenter, SilentSounds};
use rentroyale_session::view::RenderSnapshot;
use rentroyale_session::{Phase, SessionConfig, SessionEngine};

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("ws://{addr}"))
}

fn config(url: &str) -> SessionConfig {
    SessionConfig {
        url: url.to_string(),
        identity: Arc::new(AnonymousIdentity),
        media: Arc::new(LoggingPresenter),
        sound: Arc::new(SilentSounds),
    }
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.expect("accept tcp");
    accept_async(stream).await.expect("websocket handshake")
}

async fn recv_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await.expect("client closed early").expect("read frame") {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame from client: {other:?}"),
        }
    }
}

async fn send_text(ws: &mut WebSocketStream<TcpStream>, text: &str) {
    ws.send(Message::Text(text.to_string()))
        .await
        .expect("send frame");
}

/// Wait (with a real-time deadline) for a snapshot matching `pred`.
async fn wait_for(
    updates: &mut UnboundedReceiver<RenderSnapshot>,
    what: &str,
    pred: impl Fn(&RenderSnapshot) -> bool,
) -> RenderSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = updates.recv().await.expect("engine stopped");
            if pred(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

#[tokio::test]
async fn public_match_flows_over_a_real_socket() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;

        let join = recv_text(&mut ws).await;
        assert!(join.contains(r#""type":"join_br""#), "got: {join}");
        assert!(join.contains(r#""token":null"#), "anonymous join: {join}");

        send_text(&mut ws, r#"{"type":"br_joined","id":"p1"}"#).await;
        send_text(
            &mut ws,
            r#"{"type":"br_lobby_update","players":[{"name":"Ann"},{"name":"Bob"}],"count":2,"maxPlayers":10}"#,
        )
        .await;
        // A frame the client does not understand must be dropped, not fatal.
        send_text(&mut ws, r#"{"type":"br_mystery","x":1}"#).await;
        send_text(&mut ws, "definitely not json").await;
        send_text(&mut ws, r#"{"type":"br_game_start"}"#).await;
        send_text(
            &mut ws,
            r#"{"type":"br_new_round","apartment":{"photos":["https://img.example/1.jpg"],"latitude":48.8566,"longitude":2.3522,"surface":34.0,"rooms":2},"duration":30000}"#,
        )
        .await;

        let guess = recv_text(&mut ws).await;
        assert_eq!(guess, r#"{"type":"guess_br","guess":950}"#);

        send_text(
            &mut ws,
            r#"{"type":"br_round_result","actualRent":980,"eliminated":[],"results":[{"id":"p1","name":"Ann","guess":950,"distance":30,"alive":true},{"id":"p2","name":"Bob","guess":null,"distance":null,"alive":false}]}"#,
        )
        .await;

        // Hold the socket open until the client disconnects.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (handle, mut updates) = SessionEngine::spawn(config(&url)).expect("spawn engine");
    handle.join_public();

    let lobby = wait_for(&mut updates, "lobby snapshot", |s| {
        s.phase == Phase::InLobby && s.lobby.is_some()
    })
    .await;
    let view = lobby.lobby.expect("lobby view");
    assert_eq!(view.count, 2);
    assert_eq!(view.max_players, 10);

    let in_round = wait_for(&mut updates, "round snapshot", |s| {
        s.phase == Phase::InRound && s.round.is_some()
    })
    .await;
    assert!(in_round.guess_enabled);

    handle.submit_guess(" 950 ");
    // The affordance goes away the moment the guess is accepted locally.
    wait_for(&mut updates, "guess lockout", |s| {
        s.phase == Phase::InRound && !s.guess_enabled
    })
    .await;

    let result = wait_for(&mut updates, "round result", |s| {
        s.phase == Phase::ShowingRoundResult
    })
    .await;
    let result = result.result.expect("result view");
    assert_eq!(result.actual_rent, 980.0);
    assert_eq!(result.standings.len(), 2);

    handle.disconnect();
    server.await.expect("server task");
}

#[tokio::test]
async fn severed_connection_surfaces_as_connection_lost() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _join = recv_text(&mut ws).await;
        send_text(&mut ws, r#"{"type":"br_joined","id":"p1"}"#).await;
        // Drop the socket without a closing handshake.
        drop(ws);
    });

    let (handle, mut updates) = SessionEngine::spawn(config(&url)).expect("spawn engine");
    handle.join_public();

    wait_for(&mut updates, "lobby", |s| s.phase == Phase::InLobby).await;
    wait_for(&mut updates, "connection lost", |s| {
        s.phase == Phase::ConnectionLost
    })
    .await;

    server.await.expect("server task");
}

#[tokio::test]
async fn unreachable_server_surfaces_as_connection_lost() {
    // Bind to learn a free port, then close it again.
    let (listener, url) = bind().await;
    drop(listener);

    let (handle, mut updates) = SessionEngine::spawn(config(&url)).expect("spawn engine");
    handle.join_public();

    wait_for(&mut updates, "connecting", |s| s.phase == Phase::Connecting).await;
    wait_for(&mut updates, "connection lost", |s| {
        s.phase == Phase::ConnectionLost
    })
    .await;
}
