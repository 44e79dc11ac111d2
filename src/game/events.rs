//! Edge Events
//!
//! One-tick notifications raised by an entity during its update and drained
//! exactly once by the snapshot step. Replaces per-entity boolean flags that
//! would otherwise need manual clearing after every broadcast.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

/// Something that happened to an entity during the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeEvent {
    /// Hook struck an entity, or an entity was struck by a hook.
    Hit,
    /// Hook collided with another in-flight hook.
    Clashed,
    /// Captive avatar was struck a second time.
    Headshot,
    /// Hook reflected off a wall.
    Bounced,
    /// Avatar health reached zero.
    Died,
    /// Avatar came back at its fountain.
    Respawned,
    /// Avatar gained at least one level.
    LevelUp,
    /// Mine exploded.
    Detonated,
    /// Forced toss reached its destination.
    Landed,
}

/// Per-entity queue of edge events for the current tick.
#[derive(Clone, Debug, Default)]
pub struct EdgeEvents {
    pending: Vec<EdgeEvent>,
}

impl EdgeEvents {
    /// Empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an event. Raising the same event twice in a tick is a no-op.
    pub fn push(&mut self, event: EdgeEvent) {
        if !self.pending.contains(&event) {
            self.pending.push(event);
        }
    }

    /// Was this event raised since the last drain?
    pub fn contains(&self, event: EdgeEvent) -> bool {
        self.pending.contains(&event)
    }

    /// Are there no pending events?
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take all pending events, leaving the channel empty.
    pub fn drain(&mut self) -> Vec<EdgeEvent> {
        std::mem::take(&mut self.pending)
    }
}

/// Area-of-effect burst reported to clients once.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    /// Center X
    pub x: f32,
    /// Center Y
    pub y: f32,
    /// Blast radius
    pub radius: f32,
}

impl Explosion {
    /// Explosion centered at `center`.
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { x: center.x, y: center.y, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_clears() {
        let mut events = EdgeEvents::new();
        events.push(EdgeEvent::Hit);
        events.push(EdgeEvent::Hit);
        events.push(EdgeEvent::Died);

        assert!(events.contains(EdgeEvent::Died));
        assert_eq!(events.drain(), vec![EdgeEvent::Hit, EdgeEvent::Died]);
        assert!(events.is_empty());
        assert!(events.drain().is_empty());
    }

    #[test]
    fn test_event_names() {
        let json = serde_json::to_string(&[EdgeEvent::LevelUp, EdgeEvent::Headshot]).unwrap();
        assert_eq!(json, r#"["levelUp","headshot"]"#);
    }
}
