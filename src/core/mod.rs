//! Core math primitives.
//!
//! Vector math and the seeded generator shared by every simulation system.

pub mod vec2;
pub mod rng;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
