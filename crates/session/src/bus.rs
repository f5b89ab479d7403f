//! Event Bus for server-pushed session events.
//!
//! In-process publish/subscribe registry keyed by [`EventKind`]. The bus
//! decouples the transport channel from the session controller: the
//! transport dispatches every decoded frame (plus the synthetic
//! connection-lost event) and subscribers react.
//!
//! Dispatch is synchronous and in registration order, and a panicking
//! handler must not prevent later handlers from running - both are
//! explicit contracts here, not incidental behavior.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use rentroyale_protocol::ServerEvent;

/// An event as seen by bus subscribers: either a decoded server frame or
/// the transport's synthetic connection-lost notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Server(ServerEvent),
    /// The connection errored or closed unexpectedly. The session
    /// transport does not reconnect; the controller reacts by entering a
    /// terminal state.
    ConnectionLost,
}

/// Registry key: one kind per server event type, plus `ConnectionLost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Joined,
    LobbyUpdate,
    GameStart,
    NewRound,
    RoundResult,
    GameOver,
    TimerStart,
    TimerCancel,
    ConnectionLost,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Server(ev) => match ev {
                ServerEvent::Joined { .. } => EventKind::Joined,
                ServerEvent::LobbyUpdate { .. } => EventKind::LobbyUpdate,
                ServerEvent::GameStart => EventKind::GameStart,
                ServerEvent::NewRound { .. } => EventKind::NewRound,
                ServerEvent::RoundResult { .. } => EventKind::RoundResult,
                ServerEvent::GameOver { .. } => EventKind::GameOver,
                ServerEvent::TimerStart { .. } => EventKind::TimerStart,
                ServerEvent::TimerCancel => EventKind::TimerCancel,
            },
            SessionEvent::ConnectionLost => EventKind::ConnectionLost,
        }
    }
}

/// Token returned by [`EventBus::on`]; pass it to [`EventBus::off`] to
/// remove exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&SessionEvent) + Send>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(u64, Handler)>>,
}

/// Event bus for session events.
///
/// Cloning is cheap and shares the registry. Handlers must not call back
/// into the bus; dispatch holds the registry lock while invoking them.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`. Multiple handlers per kind
    /// are invoked in registration order.
    pub fn on(&self, kind: EventKind, handler: impl FnMut(&SessionEvent) + Send + 'static) -> SubscriptionId {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        SubscriptionId(id)
    }

    /// Remove the registration identified by `id`; no-op if absent.
    pub fn off(&self, id: SubscriptionId) {
        let mut registry = self.lock();
        for handlers in registry.handlers.values_mut() {
            handlers.retain(|(handler_id, _)| *handler_id != id.0);
        }
    }

    /// Synchronously invoke every handler registered for the event's kind,
    /// in registration order. A panicking handler is logged and skipped;
    /// the remaining handlers still run.
    pub fn dispatch(&self, event: &SessionEvent) {
        let kind = event.kind();
        let mut registry = self.lock();
        if let Some(handlers) = registry.handlers.get_mut(&kind) {
            for (id, handler) in handlers.iter_mut() {
                if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                    tracing::error!(?kind, subscription = *id, "event handler panicked");
                }
            }
        }
    }

    /// Remove all handlers. Used on full teardown.
    pub fn clear(&self) {
        self.lock().handlers.clear();
    }

    /// Number of handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.lock().handlers.get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        // A poisoned registry only means a handler panicked mid-dispatch;
        // the data itself is still coherent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn game_start() -> SessionEvent {
        SessionEvent::Server(ServerEvent::GameStart)
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 1..=3u32 {
            let order = Arc::clone(&order);
            bus.on(EventKind::GameStart, move |_| {
                order.lock().expect("order lock").push(tag);
            });
        }

        bus.dispatch(&game_start());
        assert_eq!(*order.lock().expect("order lock"), vec![1, 2, 3]);
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU32::new(0));

        let hits_clone = Arc::clone(&hits);
        bus.on(EventKind::TimerCancel, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.dispatch(&game_start());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.dispatch(&SessionEvent::Server(ServerEvent::TimerCancel));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_removes_exactly_one_registration() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU32::new(0));

        let hits_a = Arc::clone(&hits);
        let id = bus.on(EventKind::GameStart, move |_| {
            hits_a.fetch_add(1, Ordering::SeqCst);
        });
        let hits_b = Arc::clone(&hits);
        bus.on(EventKind::GameStart, move |_| {
            hits_b.fetch_add(10, Ordering::SeqCst);
        });

        bus.off(id);
        // Removing again is a no-op.
        bus.off(id);

        bus.dispatch(&game_start());
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn panicking_handler_does_not_block_later_handlers() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU32::new(0));

        bus.on(EventKind::GameStart, |_| panic!("boom"));
        let hits_clone = Arc::clone(&hits);
        bus.on(EventKind::GameStart, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.dispatch(&game_start());
        bus.dispatch(&game_start());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_removes_everything() {
        let bus = EventBus::new();
        bus.on(EventKind::GameStart, |_| {});
        bus.on(EventKind::ConnectionLost, |_| {});
        assert_eq!(bus.handler_count(EventKind::GameStart), 1);

        bus.clear();
        assert_eq!(bus.handler_count(EventKind::GameStart), 0);
        assert_eq!(bus.handler_count(EventKind::ConnectionLost), 0);
    }
}
