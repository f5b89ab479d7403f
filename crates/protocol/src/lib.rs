//! RentRoyale Protocol - shared wire types for the Battle Royale connection
//!
//! This crate contains all message types exchanged over the WebSocket
//! connection to the game server, in the exact JSON shapes the server
//! speaks. The session engine sends [`ClientMessage`] and receives
//! [`ServerEvent`]; the chat overlay uses its own small pair of types on
//! the same endpoint.

pub mod messages;
pub mod types;

pub use messages::{ChatClientMessage, ChatServerEvent, ClientMessage, ServerEvent};
pub use types::{Apartment, LobbyPlayer, PlayerResult};
