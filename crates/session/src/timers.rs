//! Timer subsystem: the round timer and the lobby countdown.
//!
//! Two independent, mutually exclusive-per-kind timers. Each is a spawned
//! task ticking once per second and delivering [`Signal::Tick`]s into the
//! controller's signal channel. Starting a timer while one of the same
//! kind is alive aborts the old task first, so at most one interval per
//! kind ever runs. Teardown aborts both synchronously; a tick observed
//! after teardown is a defect.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::controller::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Round,
    LobbyCountdown,
}

pub struct TimerSubsystem {
    signals: UnboundedSender<Signal>,
    round: Option<JoinHandle<()>>,
    lobby: Option<JoinHandle<()>>,
}

impl TimerSubsystem {
    pub fn new(signals: UnboundedSender<Signal>) -> Self {
        Self {
            signals,
            round: None,
            lobby: None,
        }
    }

    /// Start (or restart) the round timer with a duration in milliseconds.
    pub fn start_round(&mut self, duration_ms: u64) {
        let task = self.spawn_ticker(TimerKind::Round, duration_ms);
        Self::replace(&mut self.round, task);
    }

    /// Start (or restart) the lobby countdown.
    pub fn start_lobby_countdown(&mut self, duration_ms: u64) {
        let task = self.spawn_ticker(TimerKind::LobbyCountdown, duration_ms);
        Self::replace(&mut self.lobby, task);
    }

    pub fn cancel_round(&mut self) {
        Self::abort(&mut self.round);
    }

    pub fn cancel_lobby_countdown(&mut self) {
        Self::abort(&mut self.lobby);
    }

    /// Stop both timers. Safe to call repeatedly.
    pub fn cancel_all(&mut self) {
        self.cancel_round();
        self.cancel_lobby_countdown();
    }

    fn replace(slot: &mut Option<JoinHandle<()>>, task: JoinHandle<()>) {
        Self::abort(slot);
        *slot = Some(task);
    }

    fn abort(slot: &mut Option<JoinHandle<()>>) {
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    fn spawn_ticker(&self, kind: TimerKind, duration_ms: u64) -> JoinHandle<()> {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            let mut remaining = duration_ms / 1_000;
            // Immediate tick so the display starts at the full value.
            if signals.send(Signal::Tick(kind, remaining)).is_err() {
                return;
            }
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first interval tick completes immediately; consume it.
            interval.tick().await;
            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;
                if signals.send(Signal::Tick(kind, remaining)).is_err() {
                    return;
                }
            }
        })
    }
}

impl Drop for TimerSubsystem {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn next_tick(rx: &mut mpsc::UnboundedReceiver<Signal>) -> (TimerKind, u64) {
        match rx.recv().await {
            Some(Signal::Tick(kind, remaining)) => (kind, remaining),
            other => panic!("expected a tick, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn round_timer_counts_down_to_zero_and_stops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSubsystem::new(tx);
        timers.start_round(3_000);

        for expected in [3, 2, 1, 0] {
            let (kind, remaining) = next_tick(&mut rx).await;
            assert_eq!(kind, TimerKind::Round);
            assert_eq!(remaining, expected);
        }

        // The task stops itself at zero: nothing further arrives.
        let extra = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(extra.is_err(), "timer ticked past zero: {extra:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_the_round_timer_cancels_the_previous_one() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSubsystem::new(tx);

        // The first timer is replaced before it ever gets to run.
        timers.start_round(9_000);
        timers.start_round(2_000);

        let mut seen = Vec::new();
        while let Some(Signal::Tick(_, remaining)) =
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .ok()
                .flatten()
        {
            seen.push(remaining);
        }
        assert_eq!(seen, vec![2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn round_and_lobby_timers_are_independent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSubsystem::new(tx);
        timers.start_lobby_countdown(1_000);
        timers.start_round(1_000);

        let mut kinds = Vec::new();
        for _ in 0..4 {
            let (kind, _) = next_tick(&mut rx).await;
            kinds.push(kind);
        }
        assert_eq!(
            kinds.iter().filter(|k| **k == TimerKind::Round).count(),
            2,
            "round timer should tick 1 then 0"
        );
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == TimerKind::LobbyCountdown)
                .count(),
            2,
            "lobby countdown should tick 1 then 0"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_silences_both_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSubsystem::new(tx);
        timers.start_round(30_000);
        timers.start_lobby_countdown(30_000);
        timers.cancel_all();

        // Drain whatever the tasks managed to emit before the abort, then
        // confirm silence.
        while rx.try_recv().is_ok() {}
        let extra = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(extra.is_err(), "tick after cancel_all: {extra:?}");
    }
}
