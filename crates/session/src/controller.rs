//! Session controller: the Battle Royale state machine.
//!
//! One authoritative [`Phase`] value, mutated only by this controller in
//! reaction to bus events, timer signals and player intents. Every
//! mutation ends by emitting a [`RenderSnapshot`] so the view layer is a
//! pure function of the latest snapshot.
//!
//! The controller is deliberately tolerant of redundant or late
//! broadcasts: the sticky elimination flag and the per-round submission
//! flag are idempotent guards, and anything they reject is logged at
//! debug level and absorbed, never surfaced as an error.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use rentroyale_protocol::{ClientMessage, ServerEvent};

use crate::bus::SessionEvent;
use crate::commands::ClientMessageBuilder;
use crate::error::SessionError;
use crate::ports::{MediaPresenter, SoundCue, SoundPlayer};
use crate::timers::{TimerKind, TimerSubsystem};
use crate::view::{LobbyView, MatchOutcome, RenderSnapshot, RoundResultView, RoundView};

/// How long the elimination standings stay on screen before the player's
/// own elimination screen takes over.
pub const ELIMINATION_DISPLAY_MS: u64 = 5_000;

/// Remaining seconds at which the round timer switches to low-time styling.
pub const LOW_TIME_THRESHOLD_SECS: u64 = 10;

/// The session state machine's discriminator. Exactly one phase is active
/// at a time; `Eliminated`, `GameOver` and `ConnectionLost` are terminal
/// for the session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Connecting,
    InLobby,
    InRound,
    ShowingRoundResult,
    Eliminated,
    GameOver,
    ConnectionLost,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Eliminated | Phase::GameOver | Phase::ConnectionLost
        )
    }
}

/// Internal asynchronous signals routed back into the controller's event
/// loop: timer ticks and the delayed elimination-screen transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Tick(TimerKind, u64),
    EliminationDisplayDone,
}

pub struct SessionController {
    phase: Phase,
    /// Server-assigned id; immutable once set.
    player_id: Option<String>,
    /// Private lobby code, kept across lobby updates that omit it.
    lobby_code: Option<String>,
    lobby: Option<LobbyView>,
    round: Option<RoundView>,
    /// Sticky: transitions false -> true exactly once per session.
    eliminated: bool,
    elimination_rank: Option<usize>,
    guess_submitted: bool,
    round_remaining_secs: Option<u64>,
    low_time: bool,
    lobby_countdown_secs: Option<u64>,
    last_result: Option<RoundResultView>,
    outcome: Option<MatchOutcome>,
    timers: TimerSubsystem,
    signals: UnboundedSender<Signal>,
    updates: UnboundedSender<RenderSnapshot>,
    media: Arc<dyn MediaPresenter>,
    sound: Arc<dyn SoundPlayer>,
}

impl SessionController {
    /// Must be created inside a tokio runtime; the timer subsystem and the
    /// elimination display delay spawn tasks.
    pub fn new(
        signals: UnboundedSender<Signal>,
        updates: UnboundedSender<RenderSnapshot>,
        media: Arc<dyn MediaPresenter>,
        sound: Arc<dyn SoundPlayer>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            player_id: None,
            lobby_code: None,
            lobby: None,
            round: None,
            eliminated: false,
            elimination_rank: None,
            guess_submitted: false,
            round_remaining_secs: None,
            low_time: false,
            lobby_countdown_secs: None,
            last_result: None,
            outcome: None,
            timers: TimerSubsystem::new(signals.clone()),
            signals,
            updates,
            media,
            sound,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Move into `Connecting` ahead of a transport connect. Returns false
    /// (and does nothing) unless the session is still idle, which absorbs
    /// duplicate join intents.
    pub fn begin_connecting(&mut self) -> bool {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = ?self.phase, "join intent ignored, session already started");
            return false;
        }
        self.phase = Phase::Connecting;
        self.push_snapshot();
        true
    }

    /// The transport failed or the connection was severed. Terminal; the
    /// user must re-initiate with a fresh session.
    pub fn connection_lost(&mut self) {
        if self.phase.is_terminal() {
            tracing::debug!(phase = ?self.phase, "connection loss after terminal phase, ignored");
            return;
        }
        self.timers.cancel_all();
        self.round_remaining_secs = None;
        self.low_time = false;
        self.lobby_countdown_secs = None;
        self.phase = Phase::ConnectionLost;
        self.push_snapshot();
    }

    /// React to one bus event. Processing is synchronous and in delivery
    /// order; guards absorb anything stale.
    pub fn handle_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::ConnectionLost => self.connection_lost(),
            SessionEvent::Server(ev) => self.handle_server_event(ev),
        }
    }

    fn handle_server_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::Joined { id, lobby_code } => self.on_joined(id, lobby_code.as_deref()),
            ServerEvent::LobbyUpdate {
                players,
                count,
                max_players,
                lobby_code,
            } => self.on_lobby_update(players, *count, *max_players, lobby_code.as_deref()),
            ServerEvent::GameStart => self.on_game_start(),
            ServerEvent::NewRound {
                apartment,
                duration,
            } => self.on_new_round(apartment, *duration),
            ServerEvent::RoundResult {
                actual_rent,
                eliminated,
                results,
            } => self.on_round_result(*actual_rent, eliminated, results),
            ServerEvent::GameOver {
                winner,
                winner_name,
            } => self.on_game_over(winner, winner_name),
            ServerEvent::TimerStart { duration } => self.on_lobby_timer_start(*duration),
            ServerEvent::TimerCancel => self.on_lobby_timer_cancel(),
        }
    }

    fn on_joined(&mut self, id: &str, lobby_code: Option<&str>) {
        if self.phase != Phase::Connecting {
            tracing::debug!(phase = ?self.phase, "stale join ack ignored");
            return;
        }
        tracing::info!(player_id = %id, private = lobby_code.is_some(), "joined battle royale");
        self.player_id = Some(id.to_string());
        if let Some(code) = lobby_code {
            self.lobby_code = Some(code.to_string());
        }
        self.phase = Phase::InLobby;
        self.push_snapshot();
    }

    fn on_lobby_update(
        &mut self,
        players: &[rentroyale_protocol::LobbyPlayer],
        count: u32,
        max_players: u32,
        lobby_code: Option<&str>,
    ) {
        if self.phase != Phase::InLobby {
            tracing::debug!(phase = ?self.phase, "lobby update outside lobby ignored");
            return;
        }
        if let Some(code) = lobby_code {
            self.lobby_code = Some(code.to_string());
        }
        // The server snapshot is authoritative: replace, never merge.
        self.lobby = Some(LobbyView {
            code: self.lobby_code.clone(),
            players: players.iter().map(|p| p.name.clone()).collect(),
            count,
            max_players,
        });
        self.push_snapshot();
    }

    fn on_lobby_timer_start(&mut self, duration_ms: u64) {
        if self.phase != Phase::InLobby {
            tracing::debug!(phase = ?self.phase, "lobby countdown outside lobby ignored");
            return;
        }
        self.lobby_countdown_secs = Some(duration_ms / 1_000);
        self.timers.start_lobby_countdown(duration_ms);
        self.push_snapshot();
    }

    fn on_lobby_timer_cancel(&mut self) {
        self.timers.cancel_lobby_countdown();
        if self.lobby_countdown_secs.take().is_some() && self.phase == Phase::InLobby {
            self.push_snapshot();
        }
    }

    fn on_game_start(&mut self) {
        if self.phase != Phase::InLobby {
            tracing::debug!(phase = ?self.phase, "game start outside lobby ignored");
            return;
        }
        tracing::info!("battle royale started");
        self.timers.cancel_lobby_countdown();
        self.lobby_countdown_secs = None;
        // No round payload yet; the first br_new_round follows immediately.
        self.phase = Phase::InRound;
        self.push_snapshot();
    }

    fn on_new_round(&mut self, apartment: &rentroyale_protocol::Apartment, duration_ms: u64) {
        // Sticky guard: an eliminated player never re-enters the round UI,
        // however many rounds the survivors still play.
        if self.eliminated {
            tracing::debug!("new round ignored, player is eliminated");
            return;
        }
        if !matches!(self.phase, Phase::InRound | Phase::ShowingRoundResult) {
            tracing::debug!(phase = ?self.phase, "new round in unexpected phase ignored");
            return;
        }

        self.round = Some(RoundView {
            apartment: apartment.clone(),
            duration_ms,
        });
        self.last_result = None;
        // Re-enable the guess affordance for the new round.
        self.guess_submitted = false;

        self.media.show_photos(&apartment.photos);
        self.media.show_map(apartment.latitude, apartment.longitude);
        self.sound.play(SoundCue::RoundStart);

        let secs = duration_ms / 1_000;
        self.round_remaining_secs = Some(secs);
        self.low_time = secs <= LOW_TIME_THRESHOLD_SECS;
        self.timers.start_round(duration_ms);

        self.phase = Phase::InRound;
        self.push_snapshot();
    }

    fn on_round_result(
        &mut self,
        actual_rent: f64,
        eliminated: &[String],
        results: &[rentroyale_protocol::PlayerResult],
    ) {
        // Sticky guard: once on the elimination screen, stay there.
        if self.eliminated {
            tracing::debug!("round result ignored, player is eliminated");
            return;
        }
        if !matches!(self.phase, Phase::InRound | Phase::ShowingRoundResult) {
            tracing::debug!(phase = ?self.phase, "round result in unexpected phase ignored");
            return;
        }

        self.timers.cancel_round();
        self.round_remaining_secs = None;
        self.low_time = false;

        let own_position = self
            .player_id
            .as_ref()
            .and_then(|id| results.iter().position(|r| &r.id == id));
        let just_eliminated =
            own_position.is_some_and(|pos| !results[pos].alive);

        if just_eliminated {
            self.eliminated = true;
            // Rank is the 1-based index within this broadcast's ordering;
            // the server's ordering is authoritative.
            self.elimination_rank = own_position.map(|pos| pos + 1);
            self.sound.play(SoundCue::Defeat);
            self.schedule_elimination_display();
        }

        self.last_result = Some(RoundResultView {
            actual_rent,
            eliminated: eliminated.to_vec(),
            standings: results.to_vec(),
        });
        self.phase = Phase::ShowingRoundResult;
        self.push_snapshot();
    }

    fn on_game_over(&mut self, winner: &str, winner_name: &str) {
        if !matches!(self.phase, Phase::InRound | Phase::ShowingRoundResult) {
            // Covers Eliminated too: an eliminated player keeps their
            // elimination screen even when the match ends. Observed source
            // behavior, preserved.
            tracing::debug!(phase = ?self.phase, "game over in unexpected phase ignored");
            return;
        }
        self.timers.cancel_all();
        self.round_remaining_secs = None;
        self.low_time = false;

        let won = self.player_id.as_deref() == Some(winner);
        self.outcome = Some(if won {
            self.sound.play(SoundCue::Victory);
            MatchOutcome::Won
        } else {
            self.sound.play(SoundCue::Defeat);
            MatchOutcome::Lost {
                winner_name: winner_name.to_string(),
            }
        });
        tracing::info!(won, winner = %winner_name, "battle royale over");
        self.phase = Phase::GameOver;
        self.push_snapshot();
    }

    /// React to a timer tick or the elimination display delay.
    pub fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Tick(TimerKind::Round, remaining) => {
                if self.phase != Phase::InRound {
                    return;
                }
                self.round_remaining_secs = Some(remaining);
                self.low_time = remaining <= LOW_TIME_THRESHOLD_SECS;
                self.push_snapshot();
            }
            Signal::Tick(TimerKind::LobbyCountdown, remaining) => {
                if self.phase != Phase::InLobby {
                    return;
                }
                self.lobby_countdown_secs = Some(remaining);
                self.push_snapshot();
            }
            Signal::EliminationDisplayDone => {
                // A game-over that landed during the display window wins.
                if self.phase != Phase::ShowingRoundResult || !self.eliminated {
                    return;
                }
                self.outcome = self
                    .elimination_rank
                    .map(|rank| MatchOutcome::Eliminated { rank });
                self.phase = Phase::Eliminated;
                self.push_snapshot();
            }
        }
    }

    /// Validate and build this round's guess. The input surface is
    /// disabled immediately (the returned snapshot has `guess_enabled =
    /// false`) and re-enabled only by the next round's setup.
    pub fn prepare_guess(&mut self, raw: &str) -> Result<ClientMessage, SessionError> {
        if self.phase != Phase::InRound {
            return Err(SessionError::NoActiveRound);
        }
        if self.guess_submitted {
            return Err(SessionError::GuessAlreadySubmitted);
        }
        let guess: i64 = raw
            .trim()
            .parse()
            .map_err(|_| SessionError::InvalidGuess(raw.to_string()))?;
        self.guess_submitted = true;
        self.push_snapshot();
        Ok(ClientMessageBuilder::guess(guess))
    }

    /// Stop all timers. Called on disconnect and when the engine loop
    /// winds down; ticking after teardown is a defect.
    pub fn teardown(&mut self) {
        self.timers.cancel_all();
    }

    fn schedule_elimination_display(&self) {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(ELIMINATION_DISPLAY_MS)).await;
            let _ = signals.send(Signal::EliminationDisplayDone);
        });
    }

    /// Pure projection of the current state for the view layer.
    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            phase: self.phase,
            lobby: self.lobby.clone(),
            round: self.round.clone(),
            round_remaining_secs: self.round_remaining_secs,
            low_time: self.low_time,
            lobby_countdown_secs: self.lobby_countdown_secs,
            result: self.last_result.clone(),
            outcome: self.outcome.clone(),
            guess_enabled: self.phase == Phase::InRound && !self.guess_submitted,
        }
    }

    fn push_snapshot(&self) {
        // The receiver dropping just means nobody is watching anymore.
        let _ = self.updates.send(self.snapshot());
    }
}
