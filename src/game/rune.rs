//! Rune Spawning and Collection
//!
//! Runes sit on their landmark until they expire or an avatar in range
//! explicitly picks them up. Pickup is never automatic on overlap.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::avatar::Avatar;
use crate::game::entity::{Body, EntityId};
use crate::game::events::EdgeEvent;
use crate::game::lifecycle::{EntityManager, TickContext};

/// Collision radius (display only).
pub const RUNE_RADIUS: f32 = 16.0;

/// Seconds a rune stays on the field.
pub const RUNE_LIFETIME: f32 = 90.0;

/// Max distance for an explicit pickup.
pub const RUNE_PICKUP_RANGE: f32 = 80.0;

/// Buff duration for haste and double damage.
pub const RUNE_BUFF_DURATION: f32 = 10.0;

/// Invulnerability window.
pub const RUNE_INVULNERABILITY: f32 = 5.0;

/// Flat heal.
pub const RUNE_HEAL: f32 = 50.0;

/// Rune flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuneType {
    /// Movement speed boost
    Haste,
    /// Outgoing damage boost
    DoubleDamage,
    /// Instant heal
    Heal,
    /// Damage immunity
    Invulnerability,
}

impl RuneType {
    /// All rune types.
    pub const ALL: [RuneType; 4] = [
        RuneType::Haste,
        RuneType::DoubleDamage,
        RuneType::Heal,
        RuneType::Invulnerability,
    ];
}

/// Uniformly random rune type.
pub fn random_rune_type(rng: &mut DeterministicRng) -> RuneType {
    RuneType::ALL[rng.next_int(RuneType::ALL.len() as u32) as usize]
}

/// Rune payload.
#[derive(Clone, Debug)]
pub struct Rune {
    /// Effect granted on pickup
    pub rune_type: RuneType,
    /// Seconds left on the field
    pub lifetime: f32,
    /// Picked up, waiting for removal
    pub consumed: bool,
}

impl Rune {
    /// Fresh rune of the given type.
    pub fn new(rune_type: RuneType) -> Self {
        Self {
            rune_type,
            lifetime: RUNE_LIFETIME,
            consumed: false,
        }
    }

    /// Grant this rune's effect.
    pub fn apply(&self, avatar: &mut Avatar) {
        match self.rune_type {
            RuneType::Haste => avatar.status.haste = RUNE_BUFF_DURATION,
            RuneType::DoubleDamage => avatar.status.double_damage = RUNE_BUFF_DURATION,
            RuneType::Heal => avatar.heal(RUNE_HEAL),
            RuneType::Invulnerability => avatar.status.invulnerable = RUNE_INVULNERABILITY,
        }
    }

    /// Count down the lifetime.
    pub fn update(&mut self, body: Body<'_>, ctx: &mut TickContext<'_>) {
        self.lifetime -= ctx.dt;
        if self.lifetime <= 0.0 || self.consumed {
            ctx.pending.remove(body.id);
        }
    }

    /// Client view.
    pub fn snapshot(&self, id: EntityId, position: Vec2, events: Vec<EdgeEvent>) -> RuneSnapshot {
        RuneSnapshot {
            id,
            rune_type: self.rune_type,
            x: position.x,
            y: position.y,
            lifetime: self.lifetime,
            events,
        }
    }
}

/// Outcome of a pickup request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pickup {
    /// Effect applied, rune queued for removal
    Collected(RuneType),
    /// Too far: walk here first
    OutOfRange(Vec2),
}

/// Pick up `rune_id` with avatar `avatar_id`.
///
/// Returns `None` if either entity is gone, the avatar cannot act or the
/// rune was already taken.
pub fn try_pickup(manager: &mut EntityManager, avatar_id: EntityId, rune_id: EntityId) -> Option<Pickup> {
    let rune_pos = {
        let entity = manager.get(rune_id)?;
        let rune = entity.as_rune()?;
        if rune.consumed || manager.is_removing(rune_id) {
            return None;
        }
        entity.position
    };

    let avatar_entity = manager.get(avatar_id)?;
    if !avatar_entity.as_avatar()?.can_act() {
        return None;
    }
    if avatar_entity.position.distance(rune_pos) > RUNE_PICKUP_RANGE {
        return Some(Pickup::OutOfRange(rune_pos));
    }

    let rune = manager.get_mut(rune_id)?.as_rune_mut()?;
    rune.consumed = true;
    let taken = rune.clone();
    manager.enqueue_remove(rune_id);

    let avatar = manager.get_mut(avatar_id)?.as_avatar_mut()?;
    taken.apply(avatar);
    Some(Pickup::Collected(taken.rune_type))
}

/// Rune as shown to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuneSnapshot {
    /// Entity id
    pub id: EntityId,
    /// Effect
    pub rune_type: RuneType,
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Seconds left
    pub lifetime: f32,
    /// Edge events this tick
    pub events: Vec<EdgeEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{EntityKind, Team};
    use crate::game::map::ArenaMap;

    fn setup(rune_type: RuneType, avatar_at: Vec2) -> (EntityManager, EntityId, EntityId) {
        let mut manager = EntityManager::new();
        let avatar = manager.enqueue_add(
            avatar_at,
            EntityKind::Avatar(Avatar::new(uuid::Uuid::new_v4(), Team::Red, 0)),
        );
        let rune = manager.enqueue_add(Vec2::new(560.0, 160.0), EntityKind::Rune(Rune::new(rune_type)));
        tick(&mut manager);
        (manager, avatar, rune)
    }

    fn tick(manager: &mut EntityManager) {
        let map = ArenaMap::standard();
        let mut rng = DeterministicRng::new(8);
        let mut explosions = Vec::new();
        manager.tick(1.0 / 30.0, &map, &mut rng, &mut explosions);
    }

    #[test]
    fn test_random_rune_type_deterministic() {
        let mut a = DeterministicRng::new(12345);
        let mut b = DeterministicRng::new(12345);
        for _ in 0..50 {
            assert_eq!(random_rune_type(&mut a), random_rune_type(&mut b));
        }
    }

    #[test]
    fn test_pickup_in_range_applies_effect() {
        let (mut manager, avatar, rune) = setup(RuneType::Haste, Vec2::new(520.0, 160.0));

        assert_eq!(try_pickup(&mut manager, avatar, rune), Some(Pickup::Collected(RuneType::Haste)));
        assert_eq!(manager.get(avatar).and_then(|e| e.as_avatar()).unwrap().status.haste, RUNE_BUFF_DURATION);

        // Second request in the same tick finds it taken
        assert_eq!(try_pickup(&mut manager, avatar, rune), None);

        tick(&mut manager);
        assert!(!manager.contains(rune));
    }

    #[test]
    fn test_pickup_out_of_range_redirects() {
        let (mut manager, avatar, rune) = setup(RuneType::Heal, Vec2::new(300.0, 160.0));

        assert_eq!(try_pickup(&mut manager, avatar, rune), Some(Pickup::OutOfRange(Vec2::new(560.0, 160.0))));
        tick(&mut manager);
        assert!(manager.contains(rune));
    }

    #[test]
    fn test_heal_and_invulnerability() {
        let mut avatar = Avatar::new(uuid::Uuid::new_v4(), Team::Blue, 0);
        avatar.health = 20.0;
        Rune::new(RuneType::Heal).apply(&mut avatar);
        assert_eq!(avatar.health, 70.0);

        Rune::new(RuneType::Invulnerability).apply(&mut avatar);
        assert_eq!(avatar.status.invulnerable, RUNE_INVULNERABILITY);
    }

    #[test]
    fn test_rune_expires() {
        let (mut manager, _, rune) = setup(RuneType::DoubleDamage, Vec2::new(300.0, 300.0));
        if let Some(r) = manager.get_mut(rune).and_then(|e| e.as_rune_mut()) {
            r.lifetime = 0.01;
        }
        tick(&mut manager);
        assert!(!manager.contains(rune));
    }
}
