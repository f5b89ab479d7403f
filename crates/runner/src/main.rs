//! RentRoyale runner - composition root binary
//!
//! Wires a session engine against a live game server and logs the render
//! snapshots it emits. The graphical client renders the same snapshot
//! stream; this binary is the headless stand-in for smoke-testing a
//! server, or for just watching a match from a terminal.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rentroyale_session::ports::{AnonymousIdentity, LoggingPresenter, SilentSounds};
use rentroyale_session::{SessionConfig, SessionEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentroyale=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get WebSocket URL from environment or use default
    let ws_url = std::env::var("RENTROYALE_WS_URL")
        .unwrap_or_else(|_| "ws://127.0.0.1:3456/ws".to_string());
    // Optional private-lobby code; public matchmaking otherwise.
    let lobby_code = std::env::var("RENTROYALE_LOBBY_CODE").ok();

    tracing::info!(url = %ws_url, "starting RentRoyale session");

    let (handle, mut updates) = SessionEngine::spawn(SessionConfig {
        url: ws_url,
        identity: Arc::new(AnonymousIdentity),
        media: Arc::new(LoggingPresenter),
        sound: Arc::new(SilentSounds),
    })?;

    match lobby_code.as_deref() {
        Some(code) => handle.join_private(code),
        None => handle.join_public(),
    }

    while let Some(snapshot) = updates.recv().await {
        tracing::info!(
            phase = ?snapshot.phase,
            remaining = ?snapshot.round_remaining_secs,
            countdown = ?snapshot.lobby_countdown_secs,
            outcome = ?snapshot.outcome,
            "session update"
        );
        if let Some(lobby) = &snapshot.lobby {
            tracing::info!(
                players = ?lobby.players,
                count = lobby.count,
                max = lobby.max_players,
                code = ?lobby.code,
                "lobby"
            );
        }
        if let Some(result) = &snapshot.result {
            tracing::info!(
                actual_rent = result.actual_rent,
                eliminated = ?result.eliminated,
                "round result"
            );
        }
        if snapshot.phase.is_terminal() {
            tracing::info!("session over");
            break;
        }
    }

    handle.disconnect();
    Ok(())
}
