//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! One JSON object per text frame, discriminated by its `type` field.

use serde::{Serialize, Deserialize};

use crate::game::entity::{PlayerId, Team};
use crate::game::input::Intent;
use crate::game::simulation::GameStateUpdate;

/// Room identifier.
pub type RoomId = uuid::Uuid;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// List open rooms.
    GetRooms,

    /// Create a room and join it.
    CreateRoom {
        /// Display name
        name: String,
    },

    /// Join an existing room.
    JoinRoom {
        /// Room to join
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// Leave the current room.
    LeaveRoom,

    /// Command for the sender's avatar.
    Input {
        /// The intent
        input: Intent,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Reply to `GET_ROOMS`.
    RoomList {
        /// Open rooms
        rooms: Vec<RoomInfo>,
    },

    /// Sender joined a room.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        /// Joined room
        room_id: RoomId,
        /// Assigned team
        team: Team,
        /// Sender's player id
        player_id: PlayerId,
    },

    /// Sender left its room.
    RoomLeft,

    /// Request rejected.
    Error {
        /// Human-readable reason
        message: String,
    },

    /// Per-tick world state.
    GameState(GameStateUpdate),

    /// Server is shutting down.
    Shutdown {
        /// Reason
        reason: String,
    },
}

/// One entry of a room listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    /// Room id
    pub id: RoomId,
    /// Display name
    pub name: String,
    /// Players in the room
    pub current_players: usize,
    /// Max players
    pub capacity: usize,
    /// Match clock running
    pub is_playing: bool,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Error reply.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }
}
