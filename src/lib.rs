//! # Hook Arena Server
//!
//! Authoritative real-time server for a two-team hook arena.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HOOK ARENA SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - 2D vector                                 │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Simulation (no I/O)                       │
//! │  ├── map.rs      - Tile grid and geometry queries            │
//! │  ├── lifecycle.rs- Deferred entity add/remove                │
//! │  ├── avatar.rs   - Player avatar                             │
//! │  ├── hook.rs     - Hook projectile                           │
//! │  ├── mine.rs     - Proximity mine                            │
//! │  ├── toss.rs     - Forced toss                               │
//! │  ├── rune.rs     - Rune pickups                              │
//! │  ├── rules.rs    - Score, clock, win/draw                    │
//! │  └── simulation.rs - Per-room world                          │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── room.rs     - Rooms and membership                      │
//! │  └── scheduler.rs- Drift-compensated tick loop               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick Order
//!
//! Each room tick applies queued entity additions, updates every live
//! entity, applies queued removals, then runs the rules and broadcasts
//! one snapshot. Entities never appear or vanish mid-pass.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::vec2::Vec2;
pub use core::rng::DeterministicRng;
pub use game::{Intent, Simulation, Team};
pub use network::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Room tick rate (Hz)
pub const TICK_RATE: u32 = 30;

/// Longest step a single tick may simulate (seconds)
pub const MAX_TICK_DT: f32 = 0.1;
