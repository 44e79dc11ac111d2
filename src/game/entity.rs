//! Entity Model
//!
//! Every simulated object shares one shape (id, position, edge events) and
//! carries a closed, kind-specific payload. Cross-kind behaviour goes through
//! the capability queries here rather than checking for optional fields.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::avatar::{Avatar, AvatarSnapshot};
use crate::game::events::EdgeEvents;
use crate::game::hook::{Hook, HookSnapshot};
use crate::game::lifecycle::{Peers, TickContext};
use crate::game::mine::{Mine, MineSnapshot};
use crate::game::rune::{Rune, RuneSnapshot};
use crate::game::toss::{ForcedToss, TossSnapshot};

/// Room-local entity identifier. Never reused within a room.
pub type EntityId = u32;

/// Connected player identifier (one per session).
pub type PlayerId = uuid::Uuid;

// =============================================================================
// TEAMS
// =============================================================================

/// The two sides of the river.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Western side
    Red,
    /// Eastern side
    Blue,
}

impl Team {
    /// The other team.
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Human readable label used for the winner field.
    pub fn label(self) -> &'static str {
        match self {
            Team::Red => "Red Team",
            Team::Blue => "Blue Team",
        }
    }
}

// =============================================================================
// DAMAGE
// =============================================================================

/// Who or what dealt a point of damage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DamageSource {
    /// Damage dealt by an avatar (hook, rot, burn, toss landing).
    Player {
        /// Attacking avatar's entity id
        attacker: EntityId,
        /// Attacker's team at the time of the attack
        team: Team,
    },
    /// An avatar's own rot aura.
    SelfRot,
    /// A mine explosion.
    Mine,
    /// Anything else in the arena.
    Environment,
}

impl DamageSource {
    /// How a victim on `victim_team` died if this source dealt the last point.
    pub fn death_cause(self, victim_team: Team) -> DeathCause {
        match self {
            DamageSource::Player { team, .. } if team == victim_team => DeathCause::Denied,
            DamageSource::Player { attacker, team } => DeathCause::Killed { killer: attacker, team },
            DamageSource::SelfRot => DeathCause::Denied,
            DamageSource::Mine => DeathCause::Mine,
            DamageSource::Environment => DeathCause::Environment,
        }
    }
}

/// Why an avatar died. Only `Killed` awards score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeathCause {
    /// Finished by the enemy team.
    Killed {
        /// Killing avatar's entity id
        killer: EntityId,
        /// Team credited with the kill
        team: Team,
    },
    /// Finished by its own team (including its own rot).
    Denied,
    /// Killed by a mine.
    Mine,
    /// Killed by the arena itself.
    Environment,
}

/// Per-entity update failure. Isolated by the lifecycle manager.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EntityError {
    /// Position became NaN or infinite.
    #[error("entity {id} has a non-finite position")]
    NonFinitePosition { id: EntityId },

    /// A gameplay quantity became NaN or infinite.
    #[error("entity {id} has a non-finite {field}")]
    NonFiniteValue { id: EntityId, field: &'static str },
}

// =============================================================================
// ENTITY
// =============================================================================

/// Kind-specific payload.
#[derive(Clone, Debug)]
pub enum EntityKind {
    /// Player-controlled unit
    Avatar(Avatar),
    /// Hook projectile
    Hook(Hook),
    /// Proximity mine
    Mine(Mine),
    /// Forced displacement of another entity
    Toss(ForcedToss),
    /// Buff pickup
    Rune(Rune),
}

/// One simulated object.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Stable id
    pub id: EntityId,
    /// World position
    pub position: Vec2,
    /// Vertical offset, rendering only
    pub z: f32,
    /// Kind-specific state
    pub kind: EntityKind,
    /// Edge events raised this tick
    pub events: EdgeEvents,
}

/// Mutable view of the shared entity fields, handed to a kind's update.
pub struct Body<'e> {
    /// Entity id
    pub id: EntityId,
    /// World position
    pub position: &'e mut Vec2,
    /// Vertical offset
    pub z: &'e mut f32,
    /// Edge events
    pub events: &'e mut EdgeEvents,
}

impl Entity {
    /// Wrap a payload.
    pub fn new(id: EntityId, position: Vec2, kind: EntityKind) -> Self {
        Self {
            id,
            position,
            z: 0.0,
            kind,
            events: EdgeEvents::new(),
        }
    }

    /// Short tag used in logs and snapshots.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EntityKind::Avatar(_) => "avatar",
            EntityKind::Hook(_) => "hook",
            EntityKind::Mine(_) => "mine",
            EntityKind::Toss(_) => "toss",
            EntityKind::Rune(_) => "rune",
        }
    }

    /// Avatar payload, if this is an avatar.
    pub fn as_avatar(&self) -> Option<&Avatar> {
        match &self.kind {
            EntityKind::Avatar(a) => Some(a),
            _ => None,
        }
    }

    /// Mutable avatar payload, if this is an avatar.
    pub fn as_avatar_mut(&mut self) -> Option<&mut Avatar> {
        match &mut self.kind {
            EntityKind::Avatar(a) => Some(a),
            _ => None,
        }
    }

    /// Hook payload, if this is a hook.
    pub fn as_hook(&self) -> Option<&Hook> {
        match &self.kind {
            EntityKind::Hook(h) => Some(h),
            _ => None,
        }
    }

    /// Mutable hook payload, if this is a hook.
    pub fn as_hook_mut(&mut self) -> Option<&mut Hook> {
        match &mut self.kind {
            EntityKind::Hook(h) => Some(h),
            _ => None,
        }
    }

    /// Mine payload, if this is a mine.
    pub fn as_mine(&self) -> Option<&Mine> {
        match &self.kind {
            EntityKind::Mine(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable mine payload, if this is a mine.
    pub fn as_mine_mut(&mut self) -> Option<&mut Mine> {
        match &mut self.kind {
            EntityKind::Mine(m) => Some(m),
            _ => None,
        }
    }

    /// Rune payload, if this is a rune.
    pub fn as_rune(&self) -> Option<&Rune> {
        match &self.kind {
            EntityKind::Rune(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable rune payload, if this is a rune.
    pub fn as_rune_mut(&mut self) -> Option<&mut Rune> {
        match &mut self.kind {
            EntityKind::Rune(r) => Some(r),
            _ => None,
        }
    }

    /// Team affiliation, if the kind has one.
    pub fn team(&self) -> Option<Team> {
        match &self.kind {
            EntityKind::Avatar(a) => Some(a.team),
            EntityKind::Hook(h) => Some(h.owner_team),
            EntityKind::Mine(m) => Some(m.team),
            EntityKind::Toss(_) | EntityKind::Rune(_) => None,
        }
    }

    /// Collision radius.
    pub fn radius(&self) -> f32 {
        match &self.kind {
            EntityKind::Avatar(_) => crate::game::avatar::AVATAR_RADIUS,
            EntityKind::Hook(h) => h.radius,
            EntityKind::Mine(_) => crate::game::mine::MINE_RADIUS,
            EntityKind::Toss(_) => 0.0,
            EntityKind::Rune(_) => crate::game::rune::RUNE_RADIUS,
        }
    }

    /// Living avatar?
    pub fn is_live_avatar(&self) -> bool {
        self.as_avatar().is_some_and(|a| !a.is_dead())
    }

    /// Can this entity take damage right now?
    pub fn is_damageable(&self) -> bool {
        match &self.kind {
            EntityKind::Avatar(a) => !a.is_dead(),
            EntityKind::Mine(m) => !m.is_detonating(),
            _ => false,
        }
    }

    /// Can a hook attach to and drag this entity right now?
    pub fn is_hookable(&self) -> bool {
        match &self.kind {
            EntityKind::Avatar(a) => !a.is_dead(),
            EntityKind::Mine(m) => !m.is_detonating() && !m.being_hooked,
            _ => false,
        }
    }

    /// Route damage to the payload. Returns true if this damage killed it.
    pub fn apply_damage(&mut self, amount: f32, source: DamageSource) -> bool {
        match &mut self.kind {
            EntityKind::Avatar(a) => a.take_damage(amount, source, &mut self.events),
            EntityKind::Mine(m) => {
                m.trigger();
                false
            }
            _ => false,
        }
    }

    /// Run one tick of this entity's behaviour.
    pub fn update(
        &mut self,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) -> Result<(), EntityError> {
        let Entity { id, position, z, kind, events } = self;
        let body = Body { id: *id, position, z, events };

        match kind {
            EntityKind::Avatar(a) => a.update(body, ctx, peers)?,
            EntityKind::Hook(h) => h.update(body, ctx, peers),
            EntityKind::Mine(m) => m.update(body, ctx, peers),
            EntityKind::Toss(t) => t.update(body, ctx, peers),
            EntityKind::Rune(r) => r.update(body, ctx),
        }

        if !self.position.is_finite() || !self.z.is_finite() {
            return Err(EntityError::NonFinitePosition { id: self.id });
        }
        Ok(())
    }

    /// Serializable view for clients. Drains this tick's edge events.
    pub fn snapshot(&mut self) -> EntitySnapshot {
        let events = self.events.drain();
        let (id, pos, z) = (self.id, self.position, self.z);
        match &self.kind {
            EntityKind::Avatar(a) => EntitySnapshot::Avatar(a.snapshot(id, pos, events)),
            EntityKind::Hook(h) => EntitySnapshot::Hook(h.snapshot(id, pos, events)),
            EntityKind::Mine(m) => EntitySnapshot::Mine(m.snapshot(id, pos, events)),
            EntityKind::Toss(t) => EntitySnapshot::Toss(t.snapshot(id, pos, z, events)),
            EntityKind::Rune(r) => EntitySnapshot::Rune(r.snapshot(id, pos, events)),
        }
    }
}

/// Kind-tagged entity view sent in every game state broadcast.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntitySnapshot {
    /// Avatar view
    Avatar(AvatarSnapshot),
    /// Hook view
    Hook(HookSnapshot),
    /// Mine view
    Mine(MineSnapshot),
    /// Toss view
    Toss(TossSnapshot),
    /// Rune view
    Rune(RuneSnapshot),
}

impl EntitySnapshot {
    /// Entity id of the snapshot.
    pub fn id(&self) -> EntityId {
        match self {
            EntitySnapshot::Avatar(s) => s.id,
            EntitySnapshot::Hook(s) => s.id,
            EntitySnapshot::Mine(s) => s.id,
            EntitySnapshot::Toss(s) => s.id,
            EntitySnapshot::Rune(s) => s.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Red.opponent(), Team::Blue);
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::Red.label(), "Red Team");
    }

    #[test]
    fn test_death_cause_classification() {
        let enemy = DamageSource::Player { attacker: 7, team: Team::Blue };
        assert_eq!(enemy.death_cause(Team::Red), DeathCause::Killed { killer: 7, team: Team::Blue });

        // Own team finishing the kill is a deny
        assert_eq!(enemy.death_cause(Team::Blue), DeathCause::Denied);
        assert_eq!(DamageSource::SelfRot.death_cause(Team::Red), DeathCause::Denied);
        assert_eq!(DamageSource::Mine.death_cause(Team::Red), DeathCause::Mine);
        assert_eq!(DamageSource::Environment.death_cause(Team::Blue), DeathCause::Environment);
    }

    #[test]
    fn test_capabilities() {
        let avatar = Entity::new(1, Vec2::ZERO, EntityKind::Avatar(Avatar::new(uuid::Uuid::nil(), Team::Red, 0)));
        assert!(avatar.is_damageable());
        assert!(avatar.is_hookable());
        assert_eq!(avatar.team(), Some(Team::Red));

        let rune = Entity::new(2, Vec2::ZERO, EntityKind::Rune(Rune::new(crate::game::rune::RuneType::Heal)));
        assert!(!rune.is_damageable());
        assert!(!rune.is_hookable());
        assert_eq!(rune.team(), None);
    }
}
