//! Session engine: wiring and the single owner task.
//!
//! [`SessionEngine::spawn`] builds the whole session - transport, bus,
//! controller, timers - as one explicit context and runs the controller
//! inside a single task. Every mutation of session state happens in that
//! task, fed by one `select!` over bus events, timer signals and player
//! intents, so no locking of controller state is ever needed. The only
//! suspension point is the transport connect; outbound commands are
//! fire-and-forget.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::bus::{EventBus, EventKind, SessionEvent};
use crate::commands::ClientMessageBuilder;
use crate::controller::{SessionController, Signal};
use crate::error::TransportError;
use crate::ports::{IdentityProvider, MediaPresenter, SoundPlayer};
use crate::transport::GameServerClient;
use crate::view::RenderSnapshot;

const ALL_EVENT_KINDS: [EventKind; 9] = [
    EventKind::Joined,
    EventKind::LobbyUpdate,
    EventKind::GameStart,
    EventKind::NewRound,
    EventKind::RoundResult,
    EventKind::GameOver,
    EventKind::TimerStart,
    EventKind::TimerCancel,
    EventKind::ConnectionLost,
];

/// A player action, delivered into the engine's input stream.
#[derive(Debug, Clone)]
pub enum PlayerIntent {
    /// Join public matchmaking.
    JoinPublic,
    /// Join a code-gated private lobby.
    JoinPrivate { code: String },
    /// Create a private lobby, optionally requesting a round duration.
    CreatePrivateLobby { round_duration_ms: Option<u64> },
    /// Submit the raw guess input for this round.
    SubmitGuess { input: String },
    /// Tear the session down.
    Disconnect,
}

/// Everything a session needs from the outside world - the explicit
/// context object replacing the source's singletons.
pub struct SessionConfig {
    pub url: String,
    pub identity: Arc<dyn IdentityProvider>,
    pub media: Arc<dyn MediaPresenter>,
    pub sound: Arc<dyn SoundPlayer>,
}

/// Cloneable handle for delivering player intents to the engine.
///
/// Dropping every handle shuts the engine down (disconnect + timer
/// teardown included).
#[derive(Clone)]
pub struct SessionHandle {
    intents: UnboundedSender<PlayerIntent>,
}

impl SessionHandle {
    pub fn join_public(&self) {
        self.deliver(PlayerIntent::JoinPublic);
    }

    pub fn join_private(&self, code: &str) {
        self.deliver(PlayerIntent::JoinPrivate {
            code: code.to_string(),
        });
    }

    pub fn create_private_lobby(&self, round_duration_ms: Option<u64>) {
        self.deliver(PlayerIntent::CreatePrivateLobby { round_duration_ms });
    }

    pub fn submit_guess(&self, input: &str) {
        self.deliver(PlayerIntent::SubmitGuess {
            input: input.to_string(),
        });
    }

    pub fn disconnect(&self) {
        self.deliver(PlayerIntent::Disconnect);
    }

    fn deliver(&self, intent: PlayerIntent) {
        if self.intents.send(intent).is_err() {
            tracing::warn!("session engine already stopped, intent dropped");
        }
    }
}

pub struct SessionEngine;

impl SessionEngine {
    /// Build and start a session. Returns the intent handle and the
    /// stream of render snapshots for the view layer.
    pub fn spawn(
        config: SessionConfig,
    ) -> Result<(SessionHandle, UnboundedReceiver<RenderSnapshot>), TransportError> {
        let bus = EventBus::new();
        let client = Arc::new(GameServerClient::new(&config.url, bus.clone())?);

        let (events_tx, events_rx) = mpsc::unbounded_channel::<SessionEvent>();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel::<Signal>();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel::<RenderSnapshot>();
        let (intents_tx, intents_rx) = mpsc::unbounded_channel::<PlayerIntent>();

        // Forward every event kind into the owner task's input stream.
        for kind in ALL_EVENT_KINDS {
            let forward = events_tx.clone();
            bus.on(kind, move |event| {
                let _ = forward.send(event.clone());
            });
        }

        let controller =
            SessionController::new(signals_tx, updates_tx, config.media, config.sound);

        tokio::spawn(run_loop(
            controller,
            client,
            config.identity,
            bus,
            events_rx,
            signals_rx,
            intents_rx,
        ));

        Ok((
            SessionHandle {
                intents: intents_tx,
            },
            updates_rx,
        ))
    }
}

async fn run_loop(
    mut controller: SessionController,
    client: Arc<GameServerClient>,
    identity: Arc<dyn IdentityProvider>,
    _bus: EventBus,
    mut events_rx: UnboundedReceiver<SessionEvent>,
    mut signals_rx: UnboundedReceiver<Signal>,
    mut intents_rx: UnboundedReceiver<PlayerIntent>,
) {
    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => controller.handle_event(&event),
            Some(signal) = signals_rx.recv() => controller.on_signal(signal),
            intent = intents_rx.recv() => match intent {
                Some(intent) => handle_intent(&mut controller, &client, identity.as_ref(), intent).await,
                None => {
                    // Every handle dropped: full teardown.
                    client.disconnect();
                    controller.teardown();
                    break;
                }
            }
        }
    }
    tracing::debug!("session engine stopped");
}

async fn handle_intent(
    controller: &mut SessionController,
    client: &GameServerClient,
    identity: &dyn IdentityProvider,
    intent: PlayerIntent,
) {
    match intent {
        PlayerIntent::JoinPublic => {
            connect_then(controller, client, |token| {
                ClientMessageBuilder::join_lobby(token, None)
            }, identity)
            .await;
        }
        PlayerIntent::JoinPrivate { code } => {
            connect_then(controller, client, |token| {
                ClientMessageBuilder::join_lobby(token, Some(&code))
            }, identity)
            .await;
        }
        PlayerIntent::CreatePrivateLobby { round_duration_ms } => {
            connect_then(controller, client, |token| {
                ClientMessageBuilder::create_private_lobby(token, round_duration_ms)
            }, identity)
            .await;
        }
        PlayerIntent::SubmitGuess { input } => match controller.prepare_guess(&input) {
            Ok(message) => client.send(&message),
            Err(e) => tracing::warn!("guess rejected locally: {e}"),
        },
        PlayerIntent::Disconnect => {
            client.disconnect();
            controller.teardown();
        }
    }
}

async fn connect_then(
    controller: &mut SessionController,
    client: &GameServerClient,
    build: impl FnOnce(Option<String>) -> rentroyale_protocol::ClientMessage,
    identity: &dyn IdentityProvider,
) {
    if !controller.begin_connecting() {
        return;
    }
    if let Err(e) = client.connect().await {
        tracing::error!("failed to reach game server: {e}");
        controller.connection_lost();
        return;
    }
    client.send(&build(identity.token()));
}
