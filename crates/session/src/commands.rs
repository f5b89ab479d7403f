//! Outbound command construction.
//!
//! Centralizes the wire shapes of the three player intents so the
//! controller and the runner never build `ClientMessage` variants by hand.

use rentroyale_protocol::ClientMessage;

pub struct ClientMessageBuilder;

impl ClientMessageBuilder {
    /// Join the public lobby, or a private one when `code` is given.
    pub fn join_lobby(token: Option<String>, code: Option<&str>) -> ClientMessage {
        ClientMessage::Join {
            token,
            code: code.map(|c| c.to_string()),
        }
    }

    /// Create a private, code-gated lobby. `round_duration_ms` is a
    /// request only; the server remains authoritative per round.
    pub fn create_private_lobby(
        token: Option<String>,
        round_duration_ms: Option<u64>,
    ) -> ClientMessage {
        ClientMessage::CreatePrivate {
            token,
            round_duration: round_duration_ms,
        }
    }

    /// Submit this round's integer price guess.
    pub fn guess(guess: i64) -> ClientMessage {
        ClientMessage::Guess { guess }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_lobby_public() {
        let msg = ClientMessageBuilder::join_lobby(Some("tok".into()), None);
        match msg {
            ClientMessage::Join { token, code } => {
                assert_eq!(token.as_deref(), Some("tok"));
                assert_eq!(code, None);
            }
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn join_lobby_with_code() {
        let msg = ClientMessageBuilder::join_lobby(None, Some("XK42"));
        match msg {
            ClientMessage::Join { code, .. } => assert_eq!(code.as_deref(), Some("XK42")),
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn create_private_with_duration_override() {
        let msg = ClientMessageBuilder::create_private_lobby(Some("tok".into()), Some(45_000));
        match msg {
            ClientMessage::CreatePrivate { round_duration, .. } => {
                assert_eq!(round_duration, Some(45_000));
            }
            other => panic!("expected CreatePrivate, got {other:?}"),
        }
    }

    #[test]
    fn guess_carries_the_value() {
        assert!(matches!(
            ClientMessageBuilder::guess(980),
            ClientMessage::Guess { guess: 980 }
        ));
    }
}
