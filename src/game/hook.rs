//! Hook Projectile
//!
//! Flight modes:
//!
//! - **Outbound**: flies along its cast direction up to max range. Walls
//!   bounce it (with bounce charges), grapple it (with the grapple upgrade)
//!   or send it back. Entities get attached, other outbound hooks clash.
//! - **Returning**: retraces the owner's recorded path, dragging whatever
//!   it carries, and is destroyed on reaching the owner.
//! - **Grappling**: stays put and pulls the owner to it.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::avatar::{Avatar, AvatarState, HookStats, AVATAR_RADIUS, HOOK_COOLDOWN, HOOK_HIT_XP};
use crate::game::entity::{Body, DamageSource, EntityId, EntityKind, Team};
use crate::game::events::{EdgeEvent, EdgeEvents};
use crate::game::items::ItemEffect;
use crate::game::lifecycle::{EntityManager, Peers, TickContext};
use crate::game::map::ArenaMap;

/// Grapple gives up after this many ticks.
pub const GRAPPLE_TIMEOUT_TICKS: u32 = 180;

/// Fraction of range refunded to both hooks on a clash.
pub const CLASH_REFUND: f32 = 0.3;

/// Seconds during which a hook that just clashed cannot clash again.
pub const CLASH_COOLDOWN: f32 = 0.2;

/// Damage dealt by a headshot. Exceeds any reachable max health.
pub const HEADSHOT_DAMAGE: f32 = 1.0e6;

/// Minimum owner movement before a new path node is recorded.
const PATH_NODE_SPACING: f32 = 4.0;

/// Path length cap; older nodes are dropped beyond this.
const MAX_PATH_NODES: usize = 512;

/// Gap left between owner and a dropped entity.
const DROP_GAP: f32 = 4.0;

/// Flight mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMode {
    /// Flying away from the owner
    Outbound,
    /// Retracting along the owner's path
    Returning,
    /// Pulling the owner to a wall
    Grappling,
}

/// Hook projectile payload.
#[derive(Clone, Debug)]
pub struct Hook {
    /// Casting avatar
    pub owner: EntityId,
    /// Caster's team at cast time
    pub owner_team: Team,
    /// Unit flight direction
    pub direction: Vec2,
    /// Flight speed
    pub speed: f32,
    /// Max outbound distance
    pub range: f32,
    /// Collision radius
    pub radius: f32,
    /// Damage on hit
    pub damage: f32,
    /// Wall bounces left
    pub bounces_left: u8,
    /// Pull the owner on wall hit
    pub grapple: bool,
    /// Passive effects applied on hit
    pub on_hit: Vec<ItemEffect>,
    /// Current mode
    pub mode: HookMode,
    /// Distance flown outbound (reduced by clash refunds)
    pub traveled: f32,
    /// Attached entity
    pub carried: Option<EntityId>,
    /// Owner positions since cast, oldest first
    pub path: VecDeque<Vec2>,
    /// Seconds until this hook may clash again
    pub clash_cooldown: f32,
    /// Ticks spent grappling
    pub grapple_ticks: u32,
}

impl Hook {
    /// New outbound hook from `origin` along `direction`.
    pub fn new(owner: EntityId, owner_team: Team, origin: Vec2, direction: Vec2, stats: HookStats) -> Self {
        let mut path = VecDeque::new();
        path.push_back(origin);
        Self {
            owner,
            owner_team,
            direction,
            speed: stats.speed,
            range: stats.range,
            radius: stats.radius,
            damage: stats.damage,
            bounces_left: stats.bounces,
            grapple: stats.grapple,
            on_hit: stats.on_hit,
            mode: HookMode::Outbound,
            traveled: 0.0,
            carried: None,
            path,
            clash_cooldown: 0.0,
            grapple_ticks: 0,
        }
    }

    fn source(&self) -> DamageSource {
        DamageSource::Player { attacker: self.owner, team: self.owner_team }
    }

    /// One tick of hook behaviour.
    pub fn update(&mut self, body: Body<'_>, ctx: &mut TickContext<'_>, peers: &mut Peers<'_>) {
        let Body { id, position, events, .. } = body;

        let owner_pos = peers
            .get(self.owner)
            .filter(|e| e.as_avatar().is_some_and(|a| !a.is_dead()))
            .map(|e| e.position);
        let Some(owner_pos) = owner_pos else {
            // Owner left or died: drop everything where it is
            self.finish(id, *position, None, ctx, peers);
            return;
        };

        self.clash_cooldown = (self.clash_cooldown - ctx.dt).max(0.0);

        match self.mode {
            HookMode::Outbound => {
                self.record_owner(owner_pos);
                self.fly_outbound(id, position, events, ctx, peers);
            }
            HookMode::Returning => {
                self.record_owner(owner_pos);
                self.retract(id, position, owner_pos, ctx, peers);
            }
            HookMode::Grappling => self.pull_owner(id, *position, ctx, peers),
        }
    }

    fn record_owner(&mut self, owner_pos: Vec2) {
        let moved = self.path.back().map_or(true, |last| last.distance(owner_pos) >= PATH_NODE_SPACING);
        if moved {
            self.path.push_back(owner_pos);
            if self.path.len() > MAX_PATH_NODES {
                self.path.pop_front();
            }
        }
    }

    fn fly_outbound(
        &mut self,
        id: EntityId,
        position: &mut Vec2,
        events: &mut EdgeEvents,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) {
        let step = (self.speed * ctx.dt).min((self.range - self.traveled).max(0.0));
        let next = *position + self.direction.scale(step);

        if !ctx.map.is_hookable(next) {
            if self.grapple {
                self.mode = HookMode::Grappling;
                if let Some(owner) = peers.get_mut(self.owner).and_then(|e| e.as_avatar_mut()) {
                    owner.paused = true;
                }
            } else if self.bounces_left > 0 {
                self.bounces_left -= 1;
                self.direction = reflect(ctx.map, *position, next, self.direction);
                events.push(EdgeEvent::Bounced);
            } else {
                self.mode = HookMode::Returning;
            }
            return;
        }

        *position = next;
        self.traveled += step;

        if self.clash_cooldown <= 0.0 && self.try_clash(*position, events, ctx, peers) {
            return;
        }
        if self.try_strike(id, *position, events, peers) {
            return;
        }
        if self.traveled >= self.range {
            self.mode = HookMode::Returning;
        }
    }

    /// Bounce off another outbound hook. Returns true on a clash.
    fn try_clash(
        &mut self,
        position: Vec2,
        events: &mut EdgeEvents,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) -> bool {
        for peer in peers.iter_mut() {
            let other_pos = peer.position;
            let touching = peer.as_hook().is_some_and(|other| {
                other.owner != self.owner
                    && other.mode == HookMode::Outbound
                    && other.clash_cooldown <= 0.0
                    && position.distance(other_pos) <= self.radius + other.radius
            });
            if !touching {
                continue;
            }

            let mut normal = (position - other_pos).normalize();
            if normal == Vec2::ZERO {
                normal = ctx.rng.random_direction();
            }
            let perp = normal.perpendicular();

            self.direction = (normal + perp.scale(ctx.rng.next_range(-0.5, 0.5))).normalize();
            self.traveled = (self.traveled - CLASH_REFUND * self.range).max(0.0);
            self.clash_cooldown = CLASH_COOLDOWN;
            events.push(EdgeEvent::Clashed);

            let jitter = ctx.rng.next_range(-0.5, 0.5);
            if let Some(other) = peer.as_hook_mut() {
                other.direction = (-normal + perp.scale(jitter)).normalize();
                other.traveled = (other.traveled - CLASH_REFUND * other.range).max(0.0);
                other.clash_cooldown = CLASH_COOLDOWN;
            }
            peer.events.push(EdgeEvent::Clashed);
            return true;
        }
        false
    }

    /// Attach to, or headshot, the first entity touched. Returns true on contact.
    fn try_strike(
        &mut self,
        id: EntityId,
        position: Vec2,
        events: &mut EdgeEvents,
        peers: &mut Peers<'_>,
    ) -> bool {
        let source = self.source();
        let mut landed_on_enemy = false;
        let mut contact = false;

        for peer in peers.iter_mut() {
            if peer.id == self.owner || peer.position.distance(position) > self.radius + peer.radius() {
                continue;
            }
            let hookable = peer.is_hookable();

            match &mut peer.kind {
                EntityKind::Avatar(avatar) if hookable => {
                    let enemy = avatar.team != self.owner_team;
                    if avatar.state == AvatarState::Hooked {
                        if !enemy {
                            continue;
                        }
                        // Struck again while captive
                        avatar.take_damage(HEADSHOT_DAMAGE, source, &mut peer.events);
                        peer.events.push(EdgeEvent::Headshot);
                        events.push(EdgeEvent::Headshot);
                    } else {
                        if enemy {
                            avatar.take_damage(self.damage, source, &mut peer.events);
                            for effect in &self.on_hit {
                                avatar.apply_on_hit(*effect, source);
                            }
                            landed_on_enemy = true;
                        }
                        avatar.lock();
                        self.carried = Some(peer.id);
                        peer.events.push(EdgeEvent::Hit);
                        events.push(EdgeEvent::Hit);
                    }
                }
                EntityKind::Mine(mine) if hookable => {
                    mine.being_hooked = true;
                    mine.hook_owner = Some(self.owner);
                    self.carried = Some(peer.id);
                    peer.events.push(EdgeEvent::Hit);
                    events.push(EdgeEvent::Hit);
                }
                _ => continue,
            }

            contact = true;
            break;
        }

        if !contact {
            return false;
        }
        self.mode = HookMode::Returning;

        if landed_on_enemy {
            if let Some(owner) = peers.get_mut(self.owner) {
                if let EntityKind::Avatar(avatar) = &mut owner.kind {
                    avatar.gain_xp(HOOK_HIT_XP, &mut owner.events);
                }
            }
        }
        tracing::trace!(hook = id, carried = ?self.carried, "hook contact");
        true
    }

    fn retract(
        &mut self,
        id: EntityId,
        position: &mut Vec2,
        owner_pos: Vec2,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) {
        let mut budget = self.speed * ctx.dt;
        let mut arrived = false;

        while budget > 0.0 {
            let waypoint = self.path.front().copied().unwrap_or(owner_pos);
            let before = *position;
            let (next, reached) = before.move_towards(waypoint, budget);
            budget -= before.distance(next);
            *position = next;
            if !reached {
                break;
            }
            if self.path.pop_front().is_none() {
                arrived = true;
                break;
            }
        }

        if let Some(carried) = self.carried {
            match peers.get_mut(carried) {
                Some(entity) if !entity.as_avatar().is_some_and(Avatar::is_dead) => {
                    entity.position = *position;
                }
                // Died or was destroyed on the way back
                _ => self.carried = None,
            }
        }

        if arrived {
            self.finish(id, *position, Some(owner_pos), ctx, peers);
        }
    }

    fn pull_owner(&mut self, id: EntityId, anchor: Vec2, ctx: &mut TickContext<'_>, peers: &mut Peers<'_>) {
        self.grapple_ticks += 1;
        let mut done = self.grapple_ticks >= GRAPPLE_TIMEOUT_TICKS;

        if let Some(owner) = peers.get_mut(self.owner) {
            let (next, reached) = owner.position.move_towards(anchor, self.speed * ctx.dt);
            owner.position = next;
            if let Some(avatar) = owner.as_avatar_mut() {
                avatar.paused = true;
                avatar.target = next;
            }
            done |= reached;
        }

        if done {
            let owner_pos = peers.get(self.owner).map(|e| e.position);
            self.finish(id, anchor, owner_pos, ctx, peers);
        }
    }

    /// Drop any carried entity near the owner, free the owner and destroy the hook.
    fn finish(
        &mut self,
        id: EntityId,
        hook_pos: Vec2,
        owner_pos: Option<Vec2>,
        ctx: &mut TickContext<'_>,
        peers: &mut Peers<'_>,
    ) {
        if let Some(carried) = self.carried.take() {
            if let Some(entity) = peers.get_mut(carried) {
                let drop_at = match owner_pos {
                    Some(owner_pos) => drop_point(ctx.map, owner_pos, hook_pos, entity.radius()),
                    None => entity.position,
                };
                entity.position = drop_at;
                match &mut entity.kind {
                    EntityKind::Avatar(avatar) => avatar.release(drop_at),
                    EntityKind::Mine(mine) => mine.release(),
                    _ => {}
                }
            }
        }

        if let Some(owner) = peers.get_mut(self.owner).and_then(|e| e.as_avatar_mut()) {
            if owner.active_hook == Some(id) {
                owner.active_hook = None;
            }
            if self.mode == HookMode::Grappling {
                owner.paused = false;
            }
        }

        ctx.pending.remove(id);
    }

    /// Client view.
    pub fn snapshot(&self, id: EntityId, position: Vec2, events: Vec<EdgeEvent>) -> HookSnapshot {
        HookSnapshot {
            id,
            owner_id: self.owner,
            team: self.owner_team,
            x: position.x,
            y: position.y,
            mode: self.mode,
            radius: self.radius,
            chain: self.path.iter().copied().collect(),
            events,
        }
    }
}

/// Cast a hook from `caster` toward `target`. Returns the new hook's id.
pub fn cast(manager: &mut EntityManager, caster: EntityId, target: Vec2) -> Option<EntityId> {
    let hook = {
        let entity = manager.get_mut(caster)?;
        let origin = entity.position;
        let avatar = entity.as_avatar_mut()?;
        if !avatar.can_cast_hook() {
            return None;
        }
        let direction = (target - origin).normalize();
        if direction == Vec2::ZERO {
            return None;
        }
        avatar.hook_cooldown = HOOK_COOLDOWN;
        Hook::new(caster, avatar.team, origin, direction, avatar.hook_stats())
    };

    let origin = hook.path.front().copied().unwrap_or(Vec2::ZERO);
    let id = manager.enqueue_add(origin, EntityKind::Hook(hook));
    if let Some(avatar) = manager.get_mut(caster).and_then(|e| e.as_avatar_mut()) {
        avatar.active_hook = Some(id);
    }
    Some(id)
}

/// Reflect `dir` off whichever axis is blocked between `pos` and `next`.
fn reflect(map: &ArenaMap, pos: Vec2, next: Vec2, dir: Vec2) -> Vec2 {
    let blocked_x = !map.is_hookable(Vec2::new(next.x, pos.y));
    let blocked_y = !map.is_hookable(Vec2::new(pos.x, next.y));
    match (blocked_x, blocked_y) {
        (true, false) => Vec2::new(-dir.x, dir.y),
        (false, true) => Vec2::new(dir.x, -dir.y),
        // Corner: straight back
        _ => -dir,
    }
}

/// Where a carried entity is set down next to the owner.
fn drop_point(map: &ArenaMap, owner_pos: Vec2, hook_pos: Vec2, radius: f32) -> Vec2 {
    let dir = match (hook_pos - owner_pos).normalize() {
        d if d == Vec2::ZERO => Vec2::RIGHT,
        d => d,
    };
    let candidate = owner_pos + dir.scale(AVATAR_RADIUS + radius + DROP_GAP);
    if map.is_box_walkable(candidate, radius) {
        candidate
    } else {
        owner_pos
    }
}

/// Hook as shown to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSnapshot {
    /// Entity id
    pub id: EntityId,
    /// Owning avatar's entity id
    pub owner_id: EntityId,
    /// Owner's team
    pub team: Team,
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Flight mode
    pub mode: HookMode,
    /// Collision radius
    pub radius: f32,
    /// Chain nodes from the hook back toward the owner
    pub chain: Vec<Vec2>,
    /// Edge events this tick
    pub events: Vec<EdgeEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::entity::Entity;
    use crate::game::mine::Mine;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 30.0;

    struct World {
        map: ArenaMap,
        manager: EntityManager,
        rng: DeterministicRng,
    }

    impl World {
        fn new() -> Self {
            Self { map: ArenaMap::standard(), manager: EntityManager::new(), rng: DeterministicRng::new(5) }
        }

        fn avatar(&mut self, team: Team, pos: Vec2) -> EntityId {
            self.manager.enqueue_add(pos, EntityKind::Avatar(Avatar::new(uuid::Uuid::new_v4(), team, 0)))
        }

        fn tick(&mut self) {
            let mut explosions = Vec::new();
            self.manager.tick(DT, &self.map, &mut self.rng, &mut explosions);
        }

        fn get(&self, id: EntityId) -> &Entity {
            self.manager.get(id).unwrap()
        }

        fn hook(&self, id: EntityId) -> Option<&Hook> {
            self.manager.get(id).and_then(Entity::as_hook)
        }
    }

    #[test]
    fn test_cast_gated_by_cooldown() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(200.0, 300.0));
        assert!(cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).is_some());
        // Second cast: hook already active and on cooldown
        assert!(cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).is_none());

        let avatar = world.manager.get_mut(a).and_then(|e| e.as_avatar()).unwrap();
        assert_eq!(avatar.hook_cooldown, HOOK_COOLDOWN);
        assert!(avatar.active_hook.is_some());
    }

    #[test]
    fn test_hit_damages_and_hooks_enemy() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(200.0, 300.0));
        let b = world.avatar(Team::Blue, Vec2::new(400.0, 300.0));
        world.tick();

        let hook = cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).unwrap();
        let mut hit = false;
        for _ in 0..30 {
            world.tick();
            let victim = world.get(b).as_avatar().unwrap();
            if victim.state == AvatarState::Hooked {
                hit = true;
                break;
            }
        }
        assert!(hit);

        let victim = world.get(b).as_avatar().unwrap();
        assert_eq!(victim.health, 75.0);
        assert_eq!(world.hook(hook).unwrap().mode, HookMode::Returning);
        assert_eq!(world.hook(hook).unwrap().carried, Some(b));

        // Retracts fully, releasing the victim next to the caster
        for _ in 0..60 {
            world.tick();
        }
        assert!(world.hook(hook).is_none());
        let victim = world.get(b);
        assert_eq!(victim.as_avatar().unwrap().state, AvatarState::Idle);
        assert!(victim.position.distance(world.get(a).position) < 100.0);
        assert_eq!(world.get(a).as_avatar().unwrap().active_hook, None);
    }

    #[test]
    fn test_ally_hooked_without_damage() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(200.0, 300.0));
        let b = world.avatar(Team::Red, Vec2::new(400.0, 300.0));
        world.tick();

        cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).unwrap();
        for _ in 0..15 {
            world.tick();
        }
        assert_eq!(world.get(b).as_avatar().unwrap().health, 100.0);
    }

    #[test]
    fn test_headshot_on_captive() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(200.0, 300.0));
        let b = world.avatar(Team::Blue, Vec2::new(400.0, 300.0));
        world.tick();

        if let Some(victim) = world.manager.get_mut(b).and_then(|e| e.as_avatar_mut()) {
            victim.lock();
        }
        let hook = cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).unwrap();
        for _ in 0..15 {
            world.tick();
        }

        let victim = world.get(b).as_avatar().unwrap();
        assert!(victim.is_dead());
        // Not re-attached
        assert!(world.hook(hook).map_or(true, |h| h.carried.is_none()));
    }

    #[test]
    fn test_outbound_respects_range() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(100.0, 460.0));
        world.tick();

        let hook = cast(&mut world.manager, a, Vec2::new(700.0, 460.0)).unwrap();
        let origin = Vec2::new(100.0, 460.0);
        let mut max_seen = 0.0f32;
        for _ in 0..60 {
            world.tick();
            match world.hook(hook) {
                Some(h) if h.mode == HookMode::Outbound => {
                    max_seen = max_seen.max(world.get(hook).position.distance(origin));
                }
                _ => {}
            }
        }
        assert!(max_seen <= 500.0 + 1e-2, "flew {max_seen}");
        assert!(max_seen > 400.0);
    }

    #[test]
    fn test_wall_returns_or_bounces() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(100.0, 300.0));
        world.tick();

        // Aim straight into the north wall with one bounce charge
        if let Some(avatar) = world.manager.get_mut(a).and_then(|e| e.as_avatar_mut()) {
            avatar.upgrades.bounce = 1;
        }
        let hook = cast(&mut world.manager, a, Vec2::new(100.0, 0.0)).unwrap();
        let mut bounced = false;
        for _ in 0..20 {
            world.tick();
            if let Some(entity) = world.manager.get(hook) {
                bounced |= entity.as_hook().is_some_and(|h| h.bounces_left == 0);
            }
        }
        assert!(bounced);
    }

    #[test]
    fn test_grapple_pulls_owner() {
        let mut world = World::new();
        let start = Vec2::new(300.0, 300.0);
        let a = world.avatar(Team::Red, start);
        world.tick();

        if let Some(avatar) = world.manager.get_mut(a).and_then(|e| e.as_avatar_mut()) {
            avatar.upgrades.grapple = true;
        }
        cast(&mut world.manager, a, Vec2::new(300.0, 0.0)).unwrap();
        for _ in 0..40 {
            world.tick();
        }
        let owner = world.get(a);
        assert!(owner.position.y < start.y - 100.0);
        assert!(!owner.as_avatar().unwrap().paused);
        assert_eq!(owner.as_avatar().unwrap().active_hook, None);
    }

    #[test]
    fn test_clash_refunds_range() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(300.0, 300.0));
        let b = world.avatar(Team::Blue, Vec2::new(700.0, 300.0));
        world.tick();

        // Aim past each other on slightly offset lines so avatars are not struck first
        let ha = cast(&mut world.manager, a, Vec2::new(700.0, 320.0)).unwrap();
        let hb = cast(&mut world.manager, b, Vec2::new(300.0, 320.0)).unwrap();

        let mut clashed = false;
        for _ in 0..20 {
            world.tick();
            let events_a = world.manager.get(ha).map(|e| e.events.contains(EdgeEvent::Clashed));
            if events_a == Some(true) {
                clashed = true;
                let h = world.hook(ha).unwrap();
                assert!(h.traveled < h.range * 0.5);
                assert!(world.get(hb).events.contains(EdgeEvent::Clashed));
                break;
            }
        }
        assert!(clashed);
    }

    #[test]
    fn test_mine_dragged_by_hook() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(200.0, 300.0));
        let mine = world.manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Mine(Mine::new(Team::Blue, 99)));
        world.tick();

        cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).unwrap();
        for _ in 0..12 {
            world.tick();
        }
        let m = world.get(mine).as_mine().unwrap();
        assert!(m.being_hooked);
        assert_eq!(m.hook_owner, Some(a));
        assert!(world.get(mine).position.x < 400.0);
    }

    #[test]
    fn test_mine_held_by_another_hook_is_skipped() {
        let mut world = World::new();
        let a = world.avatar(Team::Red, Vec2::new(200.0, 300.0));
        let mine = world.manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Mine(Mine::new(Team::Blue, 99)));
        if let Some(m) = world.manager.get_mut(mine).and_then(|e| e.as_mine_mut()) {
            m.being_hooked = true;
            m.hook_owner = Some(99);
        }
        world.tick();

        cast(&mut world.manager, a, Vec2::new(400.0, 300.0)).unwrap();
        for _ in 0..12 {
            world.tick();
        }
        let m = world.get(mine).as_mine().unwrap();
        assert_eq!(m.hook_owner, Some(99));
        assert_eq!(world.get(mine).position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_reflect_axes() {
        let map = ArenaMap::standard();
        // Moving up into the north wall: y flips
        let dir = reflect(&map, Vec2::new(300.0, 45.0), Vec2::new(300.0, 35.0), Vec2::new(0.0, -1.0));
        assert_eq!(dir, Vec2::new(0.0, 1.0));
    }

    proptest! {
        #[test]
        fn prop_outbound_within_range(angle in 0.0f32..std::f32::consts::TAU) {
            let mut world = World::new();
            let origin = Vec2::new(780.0 - 400.0, 480.0);
            let a = world.avatar(Team::Red, origin);
            world.tick();
            let target = origin + Vec2::new(angle.cos(), angle.sin()).scale(100.0);
            let hook = cast(&mut world.manager, a, target).unwrap();
            for _ in 0..40 {
                world.tick();
                if let Some(h) = world.hook(hook) {
                    if h.mode == HookMode::Outbound {
                        prop_assert!(h.traveled <= h.range + 1e-3);
                    }
                }
            }
        }
    }
}
