//! Outbound ports for external collaborators.
//!
//! The engine consumes these, it never implements them: identity comes
//! from the surrounding app's auth layer, visuals go to whatever renders
//! photo carousels and maps, and sound cues go to the audio layer.
//! Implementations are expected to swallow their own failures - the
//! engine fires and forgets.

use mockall::automock;

/// Supplies the bearer token attached to join/create commands.
///
/// `None` means an anonymous session; the server accepts those.
#[automock]
pub trait IdentityProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Renders round visuals. Called once per `br_new_round`.
#[automock]
pub trait MediaPresenter: Send + Sync {
    fn show_photos(&self, photos: &[String]);
    fn show_map(&self, latitude: f64, longitude: f64);
}

/// Sound cue played at a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    RoundStart,
    Victory,
    Defeat,
}

/// Plays short cues at phase boundaries. Fire-and-forget.
#[automock]
pub trait SoundPlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// An identity provider for sessions without a logged-in user.
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn token(&self) -> Option<String> {
        None
    }
}

/// A sound player that drops every cue. Useful for headless runners.
pub struct SilentSounds;

impl SoundPlayer for SilentSounds {
    fn play(&self, _cue: SoundCue) {}
}

/// A media presenter that only logs what it would show.
pub struct LoggingPresenter;

impl MediaPresenter for LoggingPresenter {
    fn show_photos(&self, photos: &[String]) {
        tracing::debug!(count = photos.len(), "round photos ready");
    }

    fn show_map(&self, latitude: f64, longitude: f64) {
        tracing::debug!(latitude, longitude, "round map position ready");
    }
}
