//! Game Logic Module
//!
//! The authoritative per-room simulation.
//!
//! ## Module Structure
//!
//! - `map`: Static tile grid and geometry queries
//! - `entity`: Shared entity shape, teams, damage attribution
//! - `events`: One-tick edge events and explosions
//! - `lifecycle`: Deferred add/remove and the per-tick update pass
//! - `avatar`, `hook`, `mine`, `toss`, `rune`: Entity behaviours
//! - `items`: Shop items and hook upgrades
//! - `input`: Player intents
//! - `rules`: Score, clock, rune spawns, win/draw
//! - `simulation`: One room's world, ticked by the scheduler

pub mod map;
pub mod entity;
pub mod events;
pub mod lifecycle;
pub mod avatar;
pub mod hook;
pub mod mine;
pub mod toss;
pub mod rune;
pub mod items;
pub mod input;
pub mod rules;
pub mod simulation;

// Re-export key types
pub use entity::{DamageSource, DeathCause, Entity, EntityId, EntityKind, EntitySnapshot, PlayerId, Team};
pub use events::{EdgeEvent, Explosion};
pub use input::Intent;
pub use lifecycle::EntityManager;
pub use map::ArenaMap;
pub use rules::{RulesConfig, RulesEngine, RulesSummary};
pub use simulation::{GameStateUpdate, Simulation, SimulationError};
