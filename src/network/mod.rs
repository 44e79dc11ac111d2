//! Network Layer
//!
//! WebSocket server, rooms and their tick loops.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod scheduler;
pub mod room;
pub mod server;

pub use protocol::{ClientMessage, RoomId, RoomInfo, ServerMessage};
pub use room::{Room, RoomConfig, RoomError, RoomManager};
pub use scheduler::{DriftClock, TickScheduler};
pub use server::{GameServer, GameServerError, ServerConfig};
