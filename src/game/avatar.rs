//! Avatar
//!
//! The player-controlled unit. States: Idle, Moving, Hooked, Dead.
//!
//! Per tick while alive: status timers, regeneration, burn/rupture, rot,
//! movement toward the target, soft separation from other avatars and
//! an unstuck pass if terrain ended up overlapping the avatar.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::entity::{Body, DamageSource, DeathCause, EntityError, EntityId, PlayerId, Team};
use crate::game::events::{EdgeEvent, EdgeEvents};
use crate::game::items::{HookUpgrades, InventorySlot, ItemEffect, ItemKind};
use crate::game::lifecycle::{Peers, TickContext};

// =============================================================================
// TUNABLES
// =============================================================================

/// Collision radius (also the half-extent of the walkability box).
pub const AVATAR_RADIUS: f32 = 20.0;

/// Base walking speed.
pub const BASE_SPEED: f32 = 180.0;

/// Max health at level 1 without bonuses.
pub const BASE_HEALTH: f32 = 100.0;

/// Health regenerated per second.
pub const REGEN_RATE: f32 = 1.0;

/// Health regenerated per second on the own fountain.
pub const FOUNTAIN_REGEN_RATE: f32 = 15.0;

/// Seconds dead before respawning.
pub const RESPAWN_TIME: f32 = 5.0;

/// Invulnerability granted on respawn.
pub const RESPAWN_INVULNERABILITY: f32 = 2.0;

/// Gold at join.
pub const STARTING_GOLD: u32 = 300;

/// Seconds between hook casts.
pub const HOOK_COOLDOWN: f32 = 3.0;

/// Rot damage per second to each enemy in range.
pub const ROT_DPS: f32 = 30.0;

/// Rot damage per second to the caster.
pub const ROT_SELF_DPS: f32 = 10.0;

/// Rot aura radius.
pub const ROT_RADIUS: f32 = 120.0;

/// Movement multiplier while rot is on.
pub const ROT_SLOW: f32 = 0.7;

/// Movement multiplier under a haste rune.
pub const HASTE_MULTIPLIER: f32 = 1.5;

/// Damage multiplier under a double damage rune.
pub const DOUBLE_DAMAGE_MULTIPLIER: f32 = 2.0;

/// Experience for the first level-up.
pub const FIRST_LEVEL_XP: f32 = 100.0;

/// Threshold growth per level.
pub const LEVEL_XP_GROWTH: f32 = 1.5;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 25;

/// Max health gained per level.
pub const HEALTH_PER_LEVEL: f32 = 10.0;

/// Hook damage gained per level.
pub const HOOK_DAMAGE_PER_LEVEL: f32 = 5.0;

/// Gold awarded for a kill.
pub const KILL_GOLD: u32 = 150;

/// Experience awarded for a kill.
pub const KILL_XP: f32 = 100.0;

/// Permanent max health gained per kill.
pub const FLESH_HEAP_PER_KILL: f32 = 4.0;

/// Experience awarded for landing a hook.
pub const HOOK_HIT_XP: f32 = 20.0;

/// Base hook stats before upgrades.
pub const HOOK_BASE_SPEED: f32 = 600.0;
/// Base hook range.
pub const HOOK_BASE_RANGE: f32 = 500.0;
/// Base hook radius.
pub const HOOK_BASE_RADIUS: f32 = 12.0;
/// Base hook damage.
pub const HOOK_BASE_DAMAGE: f32 = 25.0;

const UNSTUCK_RINGS: usize = 10;
const UNSTUCK_STEP: f32 = 8.0;

// =============================================================================
// STATE
// =============================================================================

/// Avatar finite state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    /// Standing still
    Idle,
    /// Walking toward the target
    Moving,
    /// Position driven by a hook or toss
    Hooked,
    /// Waiting to respawn
    Dead,
}

/// Damage over time with its own source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageOverTime {
    /// Seconds left
    pub remaining: f32,
    /// Damage per second
    pub dps: f32,
    /// Extra damage per world unit moved (rupture)
    pub per_unit: f32,
    /// Credited attacker
    pub source: DamageSource,
}

/// Transient buffs and debuffs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatusEffects {
    /// Burning
    pub burn: Option<DamageOverTime>,
    /// Ruptured
    pub rupture: Option<DamageOverTime>,
    /// Seconds of invulnerability left
    pub invulnerable: f32,
    /// Seconds of haste left
    pub haste: f32,
    /// Seconds of double damage left
    pub double_damage: f32,
}

impl StatusEffects {
    fn tick_timers(&mut self, dt: f32) {
        self.invulnerable = (self.invulnerable - dt).max(0.0);
        self.haste = (self.haste - dt).max(0.0);
        self.double_damage = (self.double_damage - dt).max(0.0);
    }
}

/// Hook parameters copied into a projectile at cast time.
#[derive(Clone, Debug, PartialEq)]
pub struct HookStats {
    /// Flight speed
    pub speed: f32,
    /// Maximum outbound distance
    pub range: f32,
    /// Collision radius
    pub radius: f32,
    /// Damage on hit
    pub damage: f32,
    /// Wall bounces available
    pub bounces: u8,
    /// Pull the caster on wall hit
    pub grapple: bool,
    /// Passive effects applied to the struck entity
    pub on_hit: Vec<ItemEffect>,
}

/// Player-controlled unit.
#[derive(Clone, Debug)]
pub struct Avatar {
    /// Owning player
    pub player_id: PlayerId,
    /// Side
    pub team: Team,
    /// Fountain slot used for (re)spawning
    pub spawn_slot: usize,
    /// Current health, always within [0, max_health]
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Finite state
    pub state: AvatarState,
    /// Movement target
    pub target: Vec2,
    /// Gold
    pub gold: u32,
    /// Level, starting at 1
    pub level: u32,
    /// Experience toward the next level
    pub xp: f32,
    /// Experience needed for the next level
    pub xp_to_next: f32,
    /// Owned items
    pub items: Vec<InventorySlot>,
    /// Bought hook upgrades
    pub upgrades: HookUpgrades,
    /// Seconds until the hook can be cast again
    pub hook_cooldown: f32,
    /// In-flight hook, if any
    pub active_hook: Option<EntityId>,
    /// Permanent max health from kills
    pub flesh_heap: f32,
    /// Transient effects
    pub status: StatusEffects,
    /// Rot toggle
    pub rot_active: bool,
    /// Standing on the own fountain this tick
    pub on_healing_tile: bool,
    /// Own movement suspended (grapple pull)
    pub paused: bool,
    /// Seconds until respawn while dead
    pub respawn_timer: f32,
    /// Cause of the most recent death
    pub death_cause: Option<DeathCause>,
    /// Rune to pick up once in range
    pub pending_pickup: Option<EntityId>,
    /// Kills credited
    pub kills: u32,
    /// Deaths
    pub deaths: u32,
}

impl Avatar {
    /// Fresh avatar at full health.
    pub fn new(player_id: PlayerId, team: Team, spawn_slot: usize) -> Self {
        Self {
            player_id,
            team,
            spawn_slot,
            health: BASE_HEALTH,
            max_health: BASE_HEALTH,
            state: AvatarState::Idle,
            target: Vec2::ZERO,
            gold: STARTING_GOLD,
            level: 1,
            xp: 0.0,
            xp_to_next: FIRST_LEVEL_XP,
            items: Vec::new(),
            upgrades: HookUpgrades::default(),
            hook_cooldown: 0.0,
            active_hook: None,
            flesh_heap: 0.0,
            status: StatusEffects::default(),
            rot_active: false,
            on_healing_tile: false,
            paused: false,
            respawn_timer: 0.0,
            death_cause: None,
            pending_pickup: None,
            kills: 0,
            deaths: 0,
        }
    }

    /// Is the avatar dead?
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.state == AvatarState::Dead
    }

    /// Can the avatar accept commands?
    #[inline]
    pub fn can_act(&self) -> bool {
        !matches!(self.state, AvatarState::Dead | AvatarState::Hooked)
    }

    /// Walk toward `target`. Ignored while dead or hooked.
    pub fn set_target(&mut self, target: Vec2) -> bool {
        if !self.can_act() {
            return false;
        }
        self.target = target;
        self.state = AvatarState::Moving;
        true
    }

    /// Stop at `position`.
    pub fn stop(&mut self, position: Vec2) {
        self.target = position;
        if self.state == AvatarState::Moving {
            self.state = AvatarState::Idle;
        }
    }

    /// Toggle the rot aura.
    pub fn toggle_rot(&mut self) {
        if !self.is_dead() {
            self.rot_active = !self.rot_active;
        }
    }

    /// Enter the externally driven state.
    pub fn lock(&mut self) {
        if !self.is_dead() {
            self.state = AvatarState::Hooked;
        }
    }

    /// Leave the externally driven state at `position`. A dead avatar stays dead.
    pub fn release(&mut self, position: Vec2) {
        if self.state == AvatarState::Hooked {
            self.state = AvatarState::Idle;
            self.target = position;
        }
    }

    /// Is a hook cast possible right now?
    pub fn can_cast_hook(&self) -> bool {
        self.can_act() && !self.paused && self.hook_cooldown <= 0.0 && self.active_hook.is_none()
    }

    /// Current walking speed.
    pub fn movement_speed(&self) -> f32 {
        let mut speed = BASE_SPEED;
        if self.rot_active {
            speed *= ROT_SLOW;
        }
        if self.status.haste > 0.0 {
            speed *= HASTE_MULTIPLIER;
        }
        speed
    }

    /// Outgoing damage multiplier.
    pub fn damage_multiplier(&self) -> f32 {
        if self.status.double_damage > 0.0 {
            DOUBLE_DAMAGE_MULTIPLIER
        } else {
            1.0
        }
    }

    /// Stats for a hook cast right now.
    pub fn hook_stats(&self) -> HookStats {
        let effects = self.items.iter().map(|slot| slot.item.spec().effect);
        let range_factor: f32 = effects
            .clone()
            .filter_map(|effect| match effect {
                ItemEffect::HookRange { factor } => Some(factor),
                _ => None,
            })
            .product();

        let up = &self.upgrades;
        let base_damage = HOOK_BASE_DAMAGE
            + 10.0 * up.damage as f32
            + HOOK_DAMAGE_PER_LEVEL * (self.level - 1) as f32;

        HookStats {
            speed: HOOK_BASE_SPEED + 100.0 * up.speed as f32,
            range: (HOOK_BASE_RANGE + 75.0 * up.range as f32) * range_factor,
            radius: HOOK_BASE_RADIUS + 3.0 * up.radius as f32,
            damage: base_damage * self.damage_multiplier(),
            bounces: up.bounce,
            grapple: up.grapple,
            on_hit: effects.filter(|effect| effect.is_on_hit()).collect(),
        }
    }

    /// Apply damage. Returns true if this damage killed the avatar.
    pub fn take_damage(&mut self, amount: f32, source: DamageSource, events: &mut EdgeEvents) -> bool {
        if self.is_dead() || amount <= 0.0 || self.status.invulnerable > 0.0 {
            return false;
        }

        self.health = (self.health - amount).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.die(source.death_cause(self.team), events);
            return true;
        }
        false
    }

    fn die(&mut self, cause: DeathCause, events: &mut EdgeEvents) {
        self.health = 0.0;
        self.state = AvatarState::Dead;
        self.respawn_timer = RESPAWN_TIME;
        self.death_cause = Some(cause);
        self.rot_active = false;
        self.paused = false;
        self.pending_pickup = None;
        self.status.burn = None;
        self.status.rupture = None;
        self.deaths += 1;
        events.push(EdgeEvent::Died);
    }

    /// Restore health, up to the maximum. No effect on the dead.
    pub fn heal(&mut self, amount: f32) {
        if !self.is_dead() && amount > 0.0 {
            self.health = (self.health + amount).clamp(0.0, self.max_health);
        }
    }

    /// Raise max health, healing by the same amount.
    pub fn add_max_health(&mut self, bonus: f32) {
        self.max_health += bonus;
        if !self.is_dead() {
            self.health = (self.health + bonus).min(self.max_health);
        }
    }

    /// Add experience, levelling up as many times as the thresholds allow.
    pub fn gain_xp(&mut self, amount: f32, events: &mut EdgeEvents) {
        if self.level >= MAX_LEVEL {
            return;
        }
        self.xp += amount;
        while self.xp >= self.xp_to_next && self.level < MAX_LEVEL {
            self.xp -= self.xp_to_next;
            self.xp_to_next *= LEVEL_XP_GROWTH;
            self.level += 1;
            self.max_health += HEALTH_PER_LEVEL;
            if !self.is_dead() {
                self.health = self.max_health;
            }
            events.push(EdgeEvent::LevelUp);
        }
    }

    /// Bounty for a credited kill.
    pub fn award_kill(&mut self, events: &mut EdgeEvents) {
        self.kills += 1;
        self.gold += KILL_GOLD;
        self.flesh_heap += FLESH_HEAP_PER_KILL;
        self.add_max_health(FLESH_HEAP_PER_KILL);
        self.gain_xp(KILL_XP, events);
    }

    /// Apply an on-hit effect from an attacker's hook.
    pub fn apply_on_hit(&mut self, effect: ItemEffect, source: DamageSource) {
        if self.is_dead() {
            return;
        }
        match effect {
            ItemEffect::Burn { duration, dps } => {
                self.status.burn = Some(DamageOverTime { remaining: duration, dps, per_unit: 0.0, source });
            }
            ItemEffect::Rupture { duration, dps, per_unit } => {
                self.status.rupture = Some(DamageOverTime { remaining: duration, dps, per_unit, source });
            }
            ItemEffect::Blink { .. }
            | ItemEffect::PlaceMine { .. }
            | ItemEffect::Toss { .. }
            | ItemEffect::Heal { .. }
            | ItemEffect::HookRange { .. }
            | ItemEffect::MaxHealth { .. } => {}
        }
    }

    /// Tick any damage-over-time effect in `slot`. Returns true if it killed.
    fn tick_dot(&mut self, dt: f32, rupture: bool, events: &mut EdgeEvents) -> bool {
        let slot = if rupture { &mut self.status.rupture } else { &mut self.status.burn };
        let Some(dot) = slot.as_mut() else {
            return false;
        };
        let amount = dot.dps * dt;
        let source = dot.source;
        dot.remaining -= dt;
        if dot.remaining <= 0.0 {
            *slot = None;
        }
        self.take_damage(amount, source, events)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// One tick of avatar behaviour.
    pub fn update(
        &mut self,
        body: Body<'_>,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) -> Result<(), EntityError> {
        let Body { id, position, events, .. } = body;
        let dt = ctx.dt;

        if self.is_dead() {
            self.respawn_timer -= dt;
            if self.respawn_timer <= 0.0 {
                self.respawn(position, ctx.map.spawn_point(self.team, self.spawn_slot), events);
            }
            return Ok(());
        }

        self.hook_cooldown = (self.hook_cooldown - dt).max(0.0);
        self.status.tick_timers(dt);

        let regen = if self.on_healing_tile { FOUNTAIN_REGEN_RATE } else { REGEN_RATE };
        self.heal(regen * dt);

        if self.tick_dot(dt, false, events) || self.tick_dot(dt, true, events) {
            return Ok(());
        }

        if self.rot_active {
            // Self damage first: if it kills, the death is a deny
            if self.take_damage(ROT_SELF_DPS * dt, DamageSource::SelfRot, events) {
                return Ok(());
            }
            let source = DamageSource::Player { attacker: id, team: self.team };
            let amount = ROT_DPS * dt * self.damage_multiplier();
            let center = *position;
            for peer in peers.iter_mut() {
                let is_enemy = peer.as_avatar().is_some_and(|a| !a.is_dead() && a.team != self.team);
                if is_enemy && peer.position.distance(center) <= ROT_RADIUS {
                    peer.apply_damage(amount, source);
                }
            }
        }

        let free = self.state != AvatarState::Hooked && !self.paused;

        if free && self.state == AvatarState::Moving {
            let (next, reached) = position.move_towards(self.target, self.movement_speed() * dt);
            if ctx.map.is_box_walkable(next, AVATAR_RADIUS) {
                let moved = next.distance(*position);
                *position = next;
                if reached {
                    self.state = AvatarState::Idle;
                }
                if let Some(rupture) = self.status.rupture {
                    if self.take_damage(moved * rupture.per_unit, rupture.source, events) {
                        return Ok(());
                    }
                }
            } else {
                self.stop(*position);
            }
        }

        if free {
            separate(position, peers);
            if !ctx.map.is_box_walkable(*position, AVATAR_RADIUS) {
                if let Some(free_spot) = find_unstuck(ctx.map, *position) {
                    *position = free_spot;
                    self.stop(free_spot);
                }
            }
        }

        if !self.health.is_finite() {
            return Err(EntityError::NonFiniteValue { id, field: "health" });
        }
        Ok(())
    }

    fn respawn(&mut self, position: &mut Vec2, spawn: Vec2, events: &mut EdgeEvents) {
        *position = spawn;
        self.target = spawn;
        self.state = AvatarState::Idle;
        self.health = self.max_health;
        self.respawn_timer = 0.0;
        self.hook_cooldown = 0.0;
        self.status = StatusEffects {
            invulnerable: RESPAWN_INVULNERABILITY,
            ..StatusEffects::default()
        };
        events.push(EdgeEvent::Respawned);
    }

    /// Client view.
    pub fn snapshot(&self, id: EntityId, position: Vec2, events: Vec<EdgeEvent>) -> AvatarSnapshot {
        AvatarSnapshot {
            id,
            player_id: self.player_id,
            team: self.team,
            x: position.x,
            y: position.y,
            state: self.state,
            health: self.health,
            max_health: self.max_health,
            level: self.level,
            xp: self.xp,
            xp_to_next: self.xp_to_next,
            gold: self.gold,
            hook_cooldown: self.hook_cooldown,
            hook_cooldown_max: HOOK_COOLDOWN,
            rot_active: self.rot_active,
            items: self
                .items
                .iter()
                .map(|slot| ItemSnapshot {
                    item_id: slot.item,
                    cooldown: slot.cooldown,
                    active: slot.item.spec().effect.is_active(),
                })
                .collect(),
            upgrades: self.upgrades,
            burning: self.status.burn.is_some(),
            ruptured: self.status.rupture.is_some(),
            invulnerable: self.status.invulnerable,
            haste: self.status.haste,
            double_damage: self.status.double_damage,
            on_healing_tile: self.on_healing_tile,
            respawn_timer: self.respawn_timer,
            death_cause: self.death_cause.filter(|_| self.is_dead()),
            kills: self.kills,
            deaths: self.deaths,
            events,
        }
    }
}

/// Push this avatar and every overlapping living avatar apart by half the
/// overlap each.
fn separate(position: &mut Vec2, peers: &mut Peers<'_>) {
    let min_dist = AVATAR_RADIUS * 2.0;
    for peer in peers.iter_mut() {
        let movable = peer
            .as_avatar()
            .is_some_and(|a| !a.is_dead() && a.state != AvatarState::Hooked && !a.paused);
        if !movable {
            continue;
        }
        let delta = *position - peer.position;
        let dist = delta.length();
        if dist >= min_dist {
            continue;
        }
        let normal = if dist > f32::EPSILON { delta.scale(1.0 / dist) } else { Vec2::RIGHT };
        let push = normal.scale((min_dist - dist) * 0.5);
        *position += push;
        peer.position -= push;
    }
}

/// First fully walkable spot on expanding rings around `position`.
fn find_unstuck(map: &crate::game::map::ArenaMap, position: Vec2) -> Option<Vec2> {
    for ring in 1..=UNSTUCK_RINGS {
        let dist = ring as f32 * UNSTUCK_STEP;
        for dir in Vec2::COMPASS {
            let candidate = position + dir.scale(dist);
            if map.is_box_walkable(candidate, AVATAR_RADIUS) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Item as shown to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    /// Which item
    pub item_id: ItemKind,
    /// Seconds until usable
    pub cooldown: f32,
    /// Needs USE_ITEM
    pub active: bool,
}

/// Avatar as shown to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarSnapshot {
    /// Entity id
    pub id: EntityId,
    /// Owning player
    pub player_id: PlayerId,
    /// Side
    pub team: Team,
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Finite state
    pub state: AvatarState,
    /// Health
    pub health: f32,
    /// Max health
    pub max_health: f32,
    /// Level
    pub level: u32,
    /// Experience
    pub xp: f32,
    /// Experience threshold
    pub xp_to_next: f32,
    /// Gold
    pub gold: u32,
    /// Hook cooldown left
    pub hook_cooldown: f32,
    /// Full hook cooldown
    pub hook_cooldown_max: f32,
    /// Rot toggle
    pub rot_active: bool,
    /// Inventory
    pub items: Vec<ItemSnapshot>,
    /// Hook upgrades
    pub upgrades: HookUpgrades,
    /// Burning
    pub burning: bool,
    /// Ruptured
    pub ruptured: bool,
    /// Invulnerability left
    pub invulnerable: f32,
    /// Haste left
    pub haste: f32,
    /// Double damage left
    pub double_damage: f32,
    /// On own fountain
    pub on_healing_tile: bool,
    /// Respawn countdown
    pub respawn_timer: f32,
    /// Why the avatar is dead
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub death_cause: Option<DeathCause>,
    /// Kills
    pub kills: u32,
    /// Deaths
    pub deaths: u32,
    /// Edge events this tick
    pub events: Vec<EdgeEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::entity::{Entity, EntityKind};
    use crate::game::lifecycle::EntityManager;
    use crate::game::map::ArenaMap;
    use proptest::prelude::*;

    fn avatar(team: Team) -> Avatar {
        Avatar::new(uuid::Uuid::new_v4(), team, 0)
    }

    fn run(manager: &mut EntityManager, seconds: f32) {
        let map = ArenaMap::standard();
        let mut rng = DeterministicRng::new(9);
        let mut explosions = Vec::new();
        let dt = 1.0 / 30.0;
        let ticks = (seconds / dt).round() as usize;
        for _ in 0..ticks {
            manager.tick(dt, &map, &mut rng, &mut explosions);
        }
    }

    #[test]
    fn test_damage_and_death_once() {
        let mut a = avatar(Team::Red);
        let mut events = EdgeEvents::new();
        let enemy = DamageSource::Player { attacker: 9, team: Team::Blue };

        assert!(!a.take_damage(25.0, enemy, &mut events));
        assert_eq!(a.health, 75.0);

        assert!(a.take_damage(500.0, enemy, &mut events));
        assert_eq!(a.health, 0.0);
        assert_eq!(a.state, AvatarState::Dead);
        assert_eq!(a.respawn_timer, RESPAWN_TIME);
        assert_eq!(a.death_cause, Some(DeathCause::Killed { killer: 9, team: Team::Blue }));

        // Further damage does not die again
        assert!(!a.take_damage(10.0, enemy, &mut events));
        assert_eq!(a.deaths, 1);
    }

    #[test]
    fn test_dead_ignores_commands() {
        let mut a = avatar(Team::Red);
        a.take_damage(1000.0, DamageSource::Environment, &mut EdgeEvents::new());
        assert!(!a.set_target(Vec2::new(10.0, 10.0)));
        a.toggle_rot();
        assert!(!a.rot_active);
        assert!(!a.can_cast_hook());
    }

    #[test]
    fn test_invulnerability_blocks_damage() {
        let mut a = avatar(Team::Blue);
        a.status.invulnerable = 1.0;
        assert!(!a.take_damage(50.0, DamageSource::Mine, &mut EdgeEvents::new()));
        assert_eq!(a.health, BASE_HEALTH);
    }

    #[test]
    fn test_level_up_thresholds() {
        let mut a = avatar(Team::Red);
        let mut events = EdgeEvents::new();
        a.health = 50.0;

        // 100 for level 2, then 150 for level 3
        a.gain_xp(260.0, &mut events);
        assert_eq!(a.level, 3);
        assert!((a.xp - 10.0).abs() < 1e-3);
        assert_eq!(a.max_health, BASE_HEALTH + 2.0 * HEALTH_PER_LEVEL);
        assert_eq!(a.health, a.max_health);
        assert!(events.contains(EdgeEvent::LevelUp));
        assert_eq!(a.hook_stats().damage, HOOK_BASE_DAMAGE + 2.0 * HOOK_DAMAGE_PER_LEVEL);
    }

    #[test]
    fn test_kill_bounty() {
        let mut a = avatar(Team::Red);
        a.award_kill(&mut EdgeEvents::new());
        assert_eq!(a.gold, STARTING_GOLD + KILL_GOLD);
        assert_eq!(a.level, 2);
        assert_eq!(a.max_health, BASE_HEALTH + FLESH_HEAP_PER_KILL + HEALTH_PER_LEVEL);
    }

    #[test]
    fn test_rot_self_kill_is_deny() {
        let mut manager = EntityManager::new();
        let mut a = avatar(Team::Red);
        a.health = 0.2;
        a.rot_active = true;
        let id = manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Avatar(a));

        run(&mut manager, 0.1);
        let a = manager.get(id).and_then(Entity::as_avatar).unwrap();
        assert!(a.is_dead());
        assert_eq!(a.death_cause, Some(DeathCause::Denied));
    }

    #[test]
    fn test_rot_damages_enemies_only() {
        let mut manager = EntityManager::new();
        let mut caster = avatar(Team::Red);
        caster.rot_active = true;
        caster.health = 1000.0;
        caster.max_health = 1000.0;
        manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Avatar(caster));
        let enemy = manager.enqueue_add(Vec2::new(480.0, 300.0), EntityKind::Avatar(avatar(Team::Blue)));
        let ally = manager.enqueue_add(Vec2::new(400.0, 380.0), EntityKind::Avatar(avatar(Team::Red)));

        run(&mut manager, 1.0);
        let enemy_hp = manager.get(enemy).and_then(Entity::as_avatar).unwrap().health;
        let ally_hp = manager.get(ally).and_then(Entity::as_avatar).unwrap().health;
        // ~30 damage taken, ~1 regenerated
        assert!(enemy_hp < 75.0, "enemy at {enemy_hp}");
        assert_eq!(ally_hp, BASE_HEALTH);
    }

    #[test]
    fn test_moves_to_target_and_stops_at_walls() {
        let map = ArenaMap::standard();
        let mut manager = EntityManager::new();
        let mut a = avatar(Team::Red);
        a.set_target(Vec2::new(500.0, 300.0));
        let id = manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Avatar(a));

        run(&mut manager, 1.0);
        let entity = manager.get(id).unwrap();
        assert_eq!(entity.position, Vec2::new(500.0, 300.0));
        assert_eq!(entity.as_avatar().unwrap().state, AvatarState::Idle);

        // Walk into the river: stops on the bank
        if let Some(a) = manager.get_mut(id).and_then(|e| e.as_avatar_mut()) {
            a.set_target(Vec2::new(1000.0, 300.0));
        }
        run(&mut manager, 3.0);
        let entity = manager.get(id).unwrap();
        assert!(map.is_box_walkable(entity.position, AVATAR_RADIUS));
        assert!(entity.position.x < 19.0 * crate::game::map::TILE_SIZE);
        assert_eq!(entity.as_avatar().unwrap().state, AvatarState::Idle);
    }

    #[test]
    fn test_separation_pushes_apart() {
        let mut manager = EntityManager::new();
        let a = manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Avatar(avatar(Team::Red)));
        let b = manager.enqueue_add(Vec2::new(410.0, 300.0), EntityKind::Avatar(avatar(Team::Blue)));

        run(&mut manager, 0.1);
        let pa = manager.get(a).unwrap().position;
        let pb = manager.get(b).unwrap().position;
        assert!(pa.distance(pb) >= AVATAR_RADIUS * 2.0 - 1e-3);
    }

    #[test]
    fn test_unstuck_leaves_wall() {
        let map = ArenaMap::standard();
        let mut manager = EntityManager::new();
        // Overlapping the west wall
        let id = manager.enqueue_add(Vec2::new(50.0, 300.0), EntityKind::Avatar(avatar(Team::Red)));

        run(&mut manager, 0.05);
        assert!(map.is_box_walkable(manager.get(id).unwrap().position, AVATAR_RADIUS));
    }

    #[test]
    fn test_respawn_after_delay() {
        let map = ArenaMap::standard();
        let mut manager = EntityManager::new();
        let mut a = avatar(Team::Blue);
        a.take_damage(1000.0, DamageSource::Environment, &mut EdgeEvents::new());
        let id = manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Avatar(a));

        run(&mut manager, RESPAWN_TIME + 0.1);
        let entity = manager.get(id).unwrap();
        let a = entity.as_avatar().unwrap();
        assert_eq!(a.state, AvatarState::Idle);
        assert_eq!(a.health, a.max_health);
        assert!(a.status.invulnerable > 0.0);
        assert_eq!(entity.position, map.spawn_point(Team::Blue, 0));
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_bounds(hits in proptest::collection::vec((-50.0f32..200.0, any::<bool>()), 1..40)) {
            let mut a = avatar(Team::Red);
            let mut events = EdgeEvents::new();
            for (amount, heal) in hits {
                if heal {
                    a.heal(amount);
                } else {
                    a.take_damage(amount, DamageSource::Environment, &mut events);
                }
                prop_assert!(a.health >= 0.0 && a.health <= a.max_health);
                prop_assert_eq!(a.health == 0.0, a.is_dead());
            }
            prop_assert!(a.deaths <= 1);
        }
    }
}
