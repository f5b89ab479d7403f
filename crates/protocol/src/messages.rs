//! WebSocket message types for the Battle Royale connection
//!
//! All frames are JSON objects whose `type` field selects the variant.
//! Field names follow the server's camelCase convention on the wire;
//! optional request fields are omitted entirely when absent (the server
//! treats a missing field as "use the default").

use serde::{Deserialize, Serialize};

use crate::types::{Apartment, LobbyPlayer, PlayerResult};

// =============================================================================
// Client Messages (player -> server)
// =============================================================================

/// Messages from the client to the game server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join the public lobby, or a private one when `code` is present.
    #[serde(rename = "join_br")]
    Join {
        /// Bearer token from the identity provider; the server accepts
        /// anonymous joins, so this is sent as null when absent.
        token: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    /// Create a private, code-gated lobby.
    #[serde(rename = "create_private_br")]
    CreatePrivate {
        token: Option<String>,
        /// Requested round duration in milliseconds. Omitted means the
        /// server default; the server stays authoritative per round either
        /// way.
        #[serde(rename = "roundDuration", skip_serializing_if = "Option::is_none")]
        round_duration: Option<u64>,
    },
    /// Submit this round's price guess.
    #[serde(rename = "guess_br")]
    Guess { guess: i64 },
}

// =============================================================================
// Server Events (server -> player, broadcast push)
// =============================================================================

/// Events pushed by the game server.
///
/// These are broadcasts, not responses: the server sends them to every
/// participant of the session as the match progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Join acknowledged; carries the server-assigned player id and, for
    /// private lobbies, the join code.
    #[serde(rename = "br_joined")]
    Joined {
        id: String,
        #[serde(rename = "lobbyCode", default, skip_serializing_if = "Option::is_none")]
        lobby_code: Option<String>,
    },
    /// Full lobby snapshot; replaces any previous one wholesale.
    #[serde(rename = "br_lobby_update")]
    LobbyUpdate {
        players: Vec<LobbyPlayer>,
        count: u32,
        #[serde(rename = "maxPlayers")]
        max_players: u32,
        #[serde(rename = "lobbyCode", default, skip_serializing_if = "Option::is_none")]
        lobby_code: Option<String>,
    },
    /// The match is starting; the first round follows immediately.
    #[serde(rename = "br_game_start")]
    GameStart,
    /// A new round: one apartment and this round's duration in ms.
    #[serde(rename = "br_new_round")]
    NewRound { apartment: Apartment, duration: u64 },
    /// Result of the round just played, ordered by the server's ranking.
    #[serde(rename = "br_round_result")]
    RoundResult {
        #[serde(rename = "actualRent")]
        actual_rent: f64,
        eliminated: Vec<String>,
        results: Vec<PlayerResult>,
    },
    /// Terminal match outcome.
    #[serde(rename = "br_game_over")]
    GameOver {
        winner: String,
        #[serde(rename = "winnerName")]
        winner_name: String,
    },
    /// Lobby countdown to game start has begun.
    #[serde(rename = "br_timer_start")]
    TimerStart { duration: u64 },
    /// Lobby countdown aborted (e.g. a private lobby lost players).
    #[serde(rename = "br_timer_cancel")]
    TimerCancel,
}

// =============================================================================
// Chat overlay (same endpoint, separate message family)
// =============================================================================

/// Messages from the chat overlay client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatClientMessage {
    /// Subscribe to a streamer's chat channel.
    #[serde(rename = "join")]
    Join { channel: String },
}

/// Events pushed to the chat overlay client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatServerEvent {
    /// A numeric guess spotted in chat. The value arrives as a string and
    /// may not parse; consumers drop non-numeric payloads.
    #[serde(rename = "number")]
    Number { number: String },
}
