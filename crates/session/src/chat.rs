//! Chat overlay client: streams chat guesses and keeps a running mean.
//!
//! A companion connection to the same endpoint as the session transport,
//! speaking its own small message family. Unlike the session transport it
//! *does* reconnect automatically, with a fixed 5-second delay - that
//! asymmetry mirrors the product behavior and must stay.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use rentroyale_protocol::{ChatClientMessage, ChatServerEvent};

use crate::bus::{EventBus, EventKind, SubscriptionId};
use crate::error::TransportError;

/// Fixed retry delay between chat overlay reconnection attempts.
pub const CHAT_RECONNECT_DELAY_MS: u64 = 5_000;

#[derive(Debug, Default)]
struct MeanState {
    sum: f64,
    count: u64,
}

/// Running mean of the chat's guesses for the current round.
///
/// Cloning shares the same accumulator. Resets to empty at each new round.
#[derive(Clone, Default)]
pub struct GuessMean {
    inner: Arc<Mutex<MeanState>>,
}

impl GuessMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let mut state = self.lock();
        state.sum += value;
        state.count += 1;
    }

    pub fn reset(&self) {
        *self.lock() = MeanState::default();
    }

    /// The current mean, or 0.0 when no guesses have arrived yet.
    pub fn mean(&self) -> f64 {
        let state = self.lock();
        if state.count == 0 {
            0.0
        } else {
            state.sum / state.count as f64
        }
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MeanState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Feed one inbound chat frame into the mean. Non-chat frames on the
/// shared endpoint and non-numeric payloads are dropped silently.
fn apply_chat_frame(text: &str, mean: &GuessMean) {
    if let Ok(ChatServerEvent::Number { number }) = serde_json::from_str(text) {
        if let Ok(value) = number.trim().parse::<f64>() {
            mean.add(value);
        }
    }
}

/// The chat overlay connection.
///
/// Spawns its own socket task on construction; the task reconnects on a
/// fixed delay until the client is stopped or dropped. When handed the
/// session's [`EventBus`], the mean resets at every new round.
pub struct ChatOverlayClient {
    mean: GuessMean,
    task: JoinHandle<()>,
    bus: Option<(EventBus, SubscriptionId)>,
}

impl ChatOverlayClient {
    /// Connect the overlay for `channel`. `bus` is the session bus whose
    /// `NewRound` events reset the running mean; pass `None` for a
    /// standalone overlay.
    pub fn spawn(
        url: &str,
        channel: &str,
        bus: Option<&EventBus>,
    ) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let mean = GuessMean::new();

        let bus = bus.map(|bus| {
            let mean = mean.clone();
            let id = bus.on(EventKind::NewRound, move |_| mean.reset());
            (bus.clone(), id)
        });

        let task = tokio::spawn(run(url, channel.to_string(), mean.clone()));
        Ok(Self { mean, task, bus })
    }

    /// Shared handle to the running mean.
    pub fn guess_mean(&self) -> GuessMean {
        self.mean.clone()
    }

    pub fn mean(&self) -> f64 {
        self.mean.mean()
    }

    /// Stop reconnecting and drop the bus registration. Idempotent.
    pub fn stop(&mut self) {
        self.task.abort();
        if let Some((bus, id)) = self.bus.take() {
            bus.off(id);
        }
    }
}

impl Drop for ChatOverlayClient {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(url: Url, channel: String, mean: GuessMean) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                tracing::info!(%channel, "chat overlay connected");
                let join = ChatClientMessage::Join {
                    channel: channel.clone(),
                };
                match serde_json::to_string(&join) {
                    Ok(json) => {
                        if ws.send(Message::Text(json)).await.is_err() {
                            tracing::warn!("chat overlay failed to join channel");
                        }
                    }
                    Err(e) => tracing::error!("failed to serialize chat join: {e}"),
                }

                while let Some(frame) = ws.next().await {
                    match frame {
                        Ok(Message::Text(text)) => apply_chat_frame(&text, &mean),
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!("chat overlay stream error: {e}");
                            break;
                        }
                    }
                }
                tracing::info!("chat overlay disconnected, will retry");
            }
            Err(e) => tracing::warn!("chat overlay connect failed: {e}"),
        }

        // Fixed-delay retry; the session transport deliberately never
        // does this.
        tokio::time::sleep(Duration::from_millis(CHAT_RECONNECT_DELAY_MS)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SessionEvent;
    use rentroyale_protocol::{Apartment, ServerEvent};

    #[test]
    fn mean_of_no_guesses_is_zero() {
        let mean = GuessMean::new();
        assert_eq!(mean.mean(), 0.0);
    }

    #[test]
    fn mean_accumulates_and_resets() {
        let mean = GuessMean::new();
        mean.add(800.0);
        mean.add(1000.0);
        assert_eq!(mean.mean(), 900.0);
        assert_eq!(mean.count(), 2);

        mean.reset();
        assert_eq!(mean.mean(), 0.0);
        assert_eq!(mean.count(), 0);
    }

    #[test]
    fn chat_frames_filter_non_numeric_payloads() {
        let mean = GuessMean::new();
        apply_chat_frame(r#"{"type":"number","number":"850"}"#, &mean);
        apply_chat_frame(r#"{"type":"number","number":"oops"}"#, &mean);
        apply_chat_frame(r#"{"type":"number","number":"NaN"}"#, &mean);
        // A session broadcast leaking onto the overlay parser is ignored.
        apply_chat_frame(r#"{"type":"br_game_start"}"#, &mean);
        apply_chat_frame("not json at all", &mean);

        assert_eq!(mean.count(), 1);
        assert_eq!(mean.mean(), 850.0);
    }

    #[tokio::test]
    async fn new_round_on_the_bus_resets_the_mean() {
        let bus = EventBus::new();
        let mut overlay =
            ChatOverlayClient::spawn("ws://127.0.0.1:9", "streamer", Some(&bus))
                .expect("overlay");
        let mean = overlay.guess_mean();
        mean.add(700.0);
        assert_eq!(mean.count(), 1);

        bus.dispatch(&SessionEvent::Server(ServerEvent::NewRound {
            apartment: Apartment {
                photos: vec![],
                latitude: 0.0,
                longitude: 0.0,
                surface: 20.0,
                rooms: 1,
            },
            duration: 30_000,
        }));
        assert_eq!(mean.count(), 0);

        overlay.stop();
        assert_eq!(bus.handler_count(EventKind::NewRound), 0);
    }
}
