//! Plain data types carried inside wire messages.

use serde::{Deserialize, Serialize};

/// One listing shown during a round.
///
/// The server scrapes these from a listings site; the engine only passes
/// photos and coordinates through to the media presenter and exposes the
/// badges (surface, rooms) for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub photos: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub surface: f64,
    pub rooms: u32,
}

/// A player entry in a lobby snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub name: String,
}

/// One row of a round-result broadcast.
///
/// `guess` and `distance` are null for players who did not submit in time.
/// The ordering of these rows within the broadcast is the server's ranking
/// and must not be re-sorted client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub id: String,
    pub name: String,
    pub guess: Option<f64>,
    pub distance: Option<f64>,
    pub alive: bool,
}
