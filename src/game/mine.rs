//! Proximity Mine
//!
//! Inert until armed. Once armed it detonates when an enemy avatar comes
//! close, or, while being dragged by a hook, when anyone other than the
//! hook's caster comes close. Damage from any source (including another
//! mine's blast) sets it off on its next update.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::vec2::Vec2;
use crate::game::entity::{Body, DamageSource, EntityId, Team};
use crate::game::events::{EdgeEvent, EdgeEvents, Explosion};
use crate::game::lifecycle::{Peers, TickContext};

/// Collision radius (for hook contact).
pub const MINE_RADIUS: f32 = 10.0;

/// Seconds between placement and arming.
pub const MINE_ARM_TIME: f32 = 1.0;

/// Proximity that sets off an armed mine.
pub const MINE_TRIGGER_RADIUS: f32 = 60.0;

/// Blast radius.
pub const MINE_BLAST_RADIUS: f32 = 120.0;

/// Blast damage.
pub const MINE_DAMAGE: f32 = 150.0;

/// Seconds an untouched mine persists.
pub const MINE_LIFETIME: f32 = 60.0;

/// Mine payload.
#[derive(Clone, Debug)]
pub struct Mine {
    /// Placing team
    pub team: Team,
    /// Placing avatar
    pub owner: EntityId,
    /// Seconds until armed
    pub arm_timer: f32,
    /// Seconds until it fizzles
    pub lifetime: f32,
    /// Currently dragged by a hook
    pub being_hooked: bool,
    /// Caster of the dragging hook (exempt from the proximity trigger)
    pub hook_owner: Option<EntityId>,
    triggered: bool,
}

impl Mine {
    /// Freshly placed, unarmed mine.
    pub fn new(team: Team, owner: EntityId) -> Self {
        Self {
            team,
            owner,
            arm_timer: MINE_ARM_TIME,
            lifetime: MINE_LIFETIME,
            being_hooked: false,
            hook_owner: None,
            triggered: false,
        }
    }

    /// Has the arming delay elapsed?
    pub fn is_armed(&self) -> bool {
        self.arm_timer <= 0.0
    }

    /// Set off on the next update, armed or not.
    pub fn trigger(&mut self) {
        self.triggered = true;
    }

    /// Waiting to blow up?
    pub fn is_detonating(&self) -> bool {
        self.triggered
    }

    /// Dropped by the dragging hook.
    pub fn release(&mut self) {
        self.being_hooked = false;
        self.hook_owner = None;
    }

    /// One tick of mine behaviour.
    pub fn update(&mut self, body: Body<'_>, ctx: &mut TickContext<'_>, peers: &mut Peers<'_>) {
        let Body { id, position, events, .. } = body;

        if self.triggered {
            self.detonate(id, *position, events, ctx, peers);
            return;
        }

        self.lifetime -= ctx.dt;
        if self.lifetime <= 0.0 {
            debug!(mine = id, "mine expired");
            ctx.pending.remove(id);
            return;
        }

        self.arm_timer = (self.arm_timer - ctx.dt).max(0.0);
        if !self.is_armed() {
            return;
        }

        let center = *position;
        let tripped = peers.iter().any(|peer| {
            let Some(avatar) = peer.as_avatar() else {
                return false;
            };
            if avatar.is_dead() || peer.position.distance(center) > MINE_TRIGGER_RADIUS {
                return false;
            }
            if self.being_hooked {
                self.hook_owner != Some(peer.id)
            } else {
                avatar.team != self.team
            }
        });

        if tripped {
            self.triggered = true;
            self.detonate(id, center, events, ctx, peers);
        }
    }

    fn detonate(
        &mut self,
        id: EntityId,
        center: Vec2,
        events: &mut EdgeEvents,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) {
        for peer in peers.iter_mut() {
            if peer.is_damageable() && peer.position.distance(center) <= MINE_BLAST_RADIUS {
                peer.apply_damage(MINE_DAMAGE, DamageSource::Mine);
            }
        }

        debug!(mine = id, x = center.x, y = center.y, "mine detonated");
        ctx.explosions.push(Explosion::new(center, MINE_BLAST_RADIUS));
        events.push(EdgeEvent::Detonated);
        ctx.pending.remove(id);
    }

    /// Client view.
    pub fn snapshot(&self, id: EntityId, position: Vec2, events: Vec<EdgeEvent>) -> MineSnapshot {
        MineSnapshot {
            id,
            team: self.team,
            x: position.x,
            y: position.y,
            armed: self.is_armed(),
            being_hooked: self.being_hooked,
            events,
        }
    }
}

/// Mine as shown to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineSnapshot {
    /// Entity id
    pub id: EntityId,
    /// Placing team
    pub team: Team,
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Armed
    pub armed: bool,
    /// Being dragged
    pub being_hooked: bool,
    /// Edge events this tick
    pub events: Vec<EdgeEvent>,
}
