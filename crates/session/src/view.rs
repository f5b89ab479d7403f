//! Render-ready snapshots surfaced to the view layer.
//!
//! The view layer never reaches into the controller: after every state
//! mutation the controller emits one [`RenderSnapshot`], a pure projection
//! of the current phase plus the latest data. Rendering these is entirely
//! out of scope here.

use serde::Serialize;

use rentroyale_protocol::{Apartment, PlayerResult};

use crate::controller::Phase;

/// Everything the view needs to draw one frame of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub phase: Phase,
    pub lobby: Option<LobbyView>,
    pub round: Option<RoundView>,
    /// Remaining seconds on the round timer, when one is running.
    pub round_remaining_secs: Option<u64>,
    /// True from 10 remaining seconds down; drives the low-time styling.
    pub low_time: bool,
    /// Remaining seconds on the lobby countdown, when one is running.
    pub lobby_countdown_secs: Option<u64>,
    pub result: Option<RoundResultView>,
    pub outcome: Option<MatchOutcome>,
    /// Whether the guess input should accept a submission right now.
    pub guess_enabled: bool,
}

/// Lobby waiting-room display data. Replaced wholesale per broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbyView {
    /// Private lobby join code; `None` in public matchmaking. Masking it
    /// on screen is a display concern.
    pub code: Option<String>,
    pub players: Vec<String>,
    pub count: u32,
    pub max_players: u32,
}

/// The apartment being guessed this round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundView {
    pub apartment: Apartment,
    pub duration_ms: u64,
}

/// The most recent round-result broadcast, in server order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResultView {
    pub actual_rent: f64,
    pub eliminated: Vec<String>,
    pub standings: Vec<PlayerResult>,
}

/// Terminal outcome of the match from this player's perspective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatchOutcome {
    Won,
    Lost { winner_name: String },
    /// Knocked out mid-match; `rank` is this player's 1-based position in
    /// the eliminating broadcast's ordering.
    Eliminated { rank: usize },
}
