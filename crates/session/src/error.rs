//! Error taxonomy for the session engine.
//!
//! Transport failures surface to the caller as a terminal "connection
//! lost" state; business-logic anomalies (stale broadcasts, duplicate
//! joins) are absorbed by idempotent guards in the controller and are
//! deliberately *not* represented here. Nothing in this crate is fatal to
//! the process - at worst a session becomes unusable and the caller
//! starts a fresh one.

use thiserror::Error;

/// Failures of the underlying WebSocket transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured endpoint is not a valid WebSocket URL.
    #[error("invalid server url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The transport reported an error before the connection ever opened.
    #[error("failed to connect to game server: {0}")]
    ConnectFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// The connection was closed by the remote before it finished opening.
    #[error("connection closed before it was established")]
    ClosedBeforeOpen,
}

/// Errors surfaced by the session controller to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The guess input did not parse as an integer price. Rejected locally,
    /// nothing is sent.
    #[error("guess `{0}` is not a whole number")]
    InvalidGuess(String),

    /// A guess was already submitted for the current round; the input
    /// surface stays disabled until the next round's setup.
    #[error("a guess was already submitted this round")]
    GuessAlreadySubmitted,

    /// A guess arrived while no round is accepting input.
    #[error("no round is currently accepting guesses")]
    NoActiveRound,
}
