//! RentRoyale Session - the real-time multiplayer Battle Royale engine.
//!
//! The engine maintains a single bidirectional connection to the game
//! server, interprets the ordered stream of server-pushed events, drives
//! a client-side state machine through lobby, rounds, elimination and
//! game over, and reconciles local countdown timers with
//! server-authoritative timing. The server owns the game logic (who is
//! eliminated, the true rent, round sequencing); this crate faithfully
//! reflects and drives that remote state.
//!
//! Layout:
//! - [`transport`]: the WebSocket channel (connect/send/close, frame
//!   decoding, no auto-reconnect)
//! - [`bus`]: synchronous in-process publish/subscribe
//! - [`controller`]: the phase state machine
//! - [`timers`]: round timer and lobby countdown
//! - [`commands`]: outbound wire message construction
//! - [`engine`]: wiring and the single owner task
//! - [`chat`]: the chat-overlay companion client (this one *does*
//!   auto-reconnect, on a fixed delay)
//! - [`ports`]: collaborator traits (identity, media, sound)

pub mod bus;
pub mod chat;
pub mod commands;
pub mod controller;
pub mod engine;
pub mod error;
pub mod ports;
pub mod timers;
pub mod transport;
pub mod view;

pub use bus::{EventBus, EventKind, SessionEvent, SubscriptionId};
pub use chat::{ChatOverlayClient, GuessMean};
pub use commands::ClientMessageBuilder;
pub use controller::{Phase, SessionController, Signal};
pub use engine::{PlayerIntent, SessionConfig, SessionEngine, SessionHandle};
pub use error::{SessionError, TransportError};
pub use ports::{IdentityProvider, MediaPresenter, SoundCue, SoundPlayer};
pub use timers::{TimerKind, TimerSubsystem};
pub use transport::{ConnectionState, GameServerClient};
pub use view::{LobbyView, MatchOutcome, RenderSnapshot, RoundResultView, RoundView};
