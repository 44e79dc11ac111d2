//! Forced Toss
//!
//! Carries a locked avatar along a parabola to a landing point, then
//! releases it and damages everything around the landing spot. The
//! particle trail is cosmetic and only exists for the snapshot stream.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::entity::{Body, DamageSource, EntityId, EntityKind};
use crate::game::events::{EdgeEvent, Explosion};
use crate::game::lifecycle::{Peers, TickContext};

/// Flight speed.
pub const TOSS_SPEED: f32 = 800.0;

/// Minimum arc height.
pub const TOSS_MIN_ARC: f32 = 60.0;

/// Arc height as a fraction of the toss distance.
pub const TOSS_ARC_FACTOR: f32 = 0.25;

/// Landing pulse damage.
pub const TOSS_LANDING_DAMAGE: f32 = 75.0;

/// Landing pulse radius.
pub const TOSS_LANDING_RADIUS: f32 = 120.0;

const PARTICLE_LIFE: f32 = 0.4;
const MAX_PARTICLES: usize = 24;

/// Trail particle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TossParticle {
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Seconds left
    pub life: f32,
}

/// ForcedToss payload.
#[derive(Clone, Debug)]
pub struct ForcedToss {
    /// Displaced avatar
    pub target: EntityId,
    /// Credited for the landing damage
    pub source: DamageSource,
    start: Vec2,
    dest: Vec2,
    total: f32,
    traveled: f32,
    arc: f32,
    particles: Vec<TossParticle>,
}

impl ForcedToss {
    /// Toss `target` from `start` to `dest`.
    pub fn new(target: EntityId, source: DamageSource, start: Vec2, dest: Vec2) -> Self {
        let total = start.distance(dest);
        Self {
            target,
            source,
            start,
            dest,
            total,
            traveled: 0.0,
            arc: TOSS_MIN_ARC.max(TOSS_ARC_FACTOR * total),
            particles: Vec::new(),
        }
    }

    /// Flight progress in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.total <= f32::EPSILON {
            1.0
        } else {
            (self.traveled / self.total).min(1.0)
        }
    }

    /// Height above the ground at the current progress.
    pub fn height(&self) -> f32 {
        let p = self.progress();
        4.0 * self.arc * p * (1.0 - p)
    }

    /// One tick of toss behaviour.
    pub fn update(&mut self, body: Body<'_>, ctx: &mut TickContext<'_>, peers: &mut Peers<'_>) {
        let Body { id, position, z, events } = body;

        let carried = peers.get(self.target).is_some_and(|e| e.is_live_avatar());
        if !carried {
            // Victim left or died mid-flight
            if let Some(entity) = peers.get_mut(self.target) {
                entity.z = 0.0;
            }
            ctx.pending.remove(id);
            return;
        }

        self.traveled = (self.traveled + TOSS_SPEED * ctx.dt).min(self.total);
        *position = self.start.lerp(self.dest, self.progress());
        *z = self.height();

        for particle in &mut self.particles {
            particle.life -= ctx.dt;
        }
        self.particles.retain(|p| p.life > 0.0);
        if self.particles.len() < MAX_PARTICLES {
            self.particles.push(TossParticle {
                x: position.x + ctx.rng.next_range(-6.0, 6.0),
                y: position.y + ctx.rng.next_range(-6.0, 6.0),
                life: PARTICLE_LIFE,
            });
        }

        if let Some(entity) = peers.get_mut(self.target) {
            entity.position = *position;
            entity.z = *z;
        }

        if self.progress() < 1.0 {
            return;
        }

        // Landing
        let landing = self.dest;
        if let Some(entity) = peers.get_mut(self.target) {
            entity.position = landing;
            entity.z = 0.0;
            entity.events.push(EdgeEvent::Landed);
            if let EntityKind::Avatar(avatar) = &mut entity.kind {
                avatar.release(landing);
            }
        }

        for peer in peers.iter_mut() {
            if peer.id != self.target
                && peer.is_damageable()
                && peer.position.distance(landing) <= TOSS_LANDING_RADIUS
            {
                peer.apply_damage(TOSS_LANDING_DAMAGE, self.source);
            }
        }

        *z = 0.0;
        ctx.explosions.push(Explosion::new(landing, TOSS_LANDING_RADIUS));
        events.push(EdgeEvent::Landed);
        ctx.pending.remove(id);
    }

    /// Client view.
    pub fn snapshot(&self, id: EntityId, position: Vec2, z: f32, events: Vec<EdgeEvent>) -> TossSnapshot {
        TossSnapshot {
            id,
            x: position.x,
            y: position.y,
            z,
            progress: self.progress(),
            particles: self.particles.clone(),
            events,
        }
    }
}

/// Toss as shown to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TossSnapshot {
    /// Entity id
    pub id: EntityId,
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Height
    pub z: f32,
    /// Flight progress in [0, 1]
    pub progress: f32,
    /// Trail particles
    pub particles: Vec<TossParticle>,
    /// Edge events this tick
    pub events: Vec<EdgeEvent>,
}
