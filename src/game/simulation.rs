//! Room Simulation
//!
//! One authoritative game world: map, entities, rules and the room's
//! random generator. The room drives it with `tick` at a fixed rate and
//! feeds it intents in between.
//!
//! Per-tick order:
//!
//! 1. pre-pass over avatars (healing tile, item cooldowns, pending pickups)
//! 2. lifecycle tick (all entity behaviour)
//! 3. rules tick (deaths, clock, rune spawns)
//! 4. snapshot, which also drains every entity's edge events

use std::collections::HashMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::avatar::Avatar;
use crate::game::entity::{EntityId, EntityKind, EntitySnapshot, PlayerId, Team};
use crate::game::events::Explosion;
use crate::game::hook;
use crate::game::input::{InputError, Intent};
use crate::game::items::{self, ItemError};
use crate::game::lifecycle::EntityManager;
use crate::game::map::ArenaMap;
use crate::game::rules::{RulesConfig, RulesEngine, RulesSummary};
use crate::game::rune::{self, Pickup, RUNE_PICKUP_RANGE};
use crate::MAX_TICK_DT;

/// Errors from player commands.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SimulationError {
    /// Player has no avatar in this simulation.
    #[error("player {0} is not in this game")]
    UnknownPlayer(PlayerId),

    /// Player already has an avatar.
    #[error("player {0} already joined")]
    AlreadyJoined(PlayerId),

    /// Malformed intent.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Shop or item rejection.
    #[error(transparent)]
    Item(#[from] ItemError),
}

/// Broadcast payload for one tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdate {
    /// Score and clock
    pub rules: RulesSummary,
    /// Wall clock at send time, Unix milliseconds
    pub server_time: i64,
    /// Simulation tick counter
    pub tick: u64,
    /// All live entities
    pub entities: Vec<EntitySnapshot>,
    /// Explosions since the previous update
    pub explosions: Vec<Explosion>,
}

/// One room's game world.
#[derive(Debug)]
pub struct Simulation {
    map: ArenaMap,
    manager: EntityManager,
    rules: RulesEngine,
    rng: DeterministicRng,
    players: HashMap<PlayerId, EntityId>,
    explosions: Vec<Explosion>,
    ticks: u64,
}

impl Simulation {
    /// New world on the standard map with default rules.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, ArenaMap::standard(), RulesConfig::default())
    }

    /// New world with an explicit map and rules.
    pub fn with_config(seed: u64, map: ArenaMap, config: RulesConfig) -> Self {
        Self {
            map,
            manager: EntityManager::new(),
            rules: RulesEngine::new(config),
            rng: DeterministicRng::new(seed),
            players: HashMap::new(),
            explosions: Vec::new(),
            ticks: 0,
        }
    }

    /// Arena geometry.
    pub fn map(&self) -> &ArenaMap {
        &self.map
    }

    /// Entity collection.
    pub fn entities(&self) -> &EntityManager {
        &self.manager
    }

    /// Rules state.
    pub fn rules(&self) -> &RulesEngine {
        &self.rules
    }

    /// Ticks simulated so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Avatar entity of a player.
    pub fn avatar_of(&self, player_id: PlayerId) -> Option<EntityId> {
        self.players.get(&player_id).copied()
    }

    /// Number of players on a team.
    pub fn team_size(&self, team: Team) -> usize {
        self.manager
            .iter_all()
            .filter(|e| e.as_avatar().is_some_and(|a| a.team == team))
            .count()
    }

    /// Spawn an avatar for a player. It becomes live at the next tick.
    pub fn add_player(&mut self, player_id: PlayerId, team: Team) -> Result<EntityId, SimulationError> {
        if self.players.contains_key(&player_id) {
            return Err(SimulationError::AlreadyJoined(player_id));
        }

        let slot = self.free_spawn_slot(team);
        let spawn = self.map.spawn_point(team, slot);
        let mut avatar = Avatar::new(player_id, team, slot);
        avatar.target = spawn;

        let id = self.manager.enqueue_add(spawn, EntityKind::Avatar(avatar));
        self.players.insert(player_id, id);
        self.rules.check_start(&self.manager);

        info!(%player_id, entity = id, team = team.label(), "player joined simulation");
        Ok(id)
    }

    fn free_spawn_slot(&self, team: Team) -> usize {
        let taken: Vec<usize> = self
            .manager
            .iter_all()
            .filter_map(|e| e.as_avatar())
            .filter(|a| a.team == team)
            .map(|a| a.spawn_slot)
            .collect();
        (0..).find(|slot| !taken.contains(slot)).unwrap_or(0)
    }

    /// Remove a player's avatar and its hook right away. Returns false if unknown.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        let Some(avatar_id) = self.players.remove(&player_id) else {
            return false;
        };

        let hook_id = self
            .manager
            .get_mut(avatar_id)
            .and_then(|e| e.as_avatar())
            .and_then(|a| a.active_hook);

        if let Some(hook_id) = hook_id {
            let carried = self
                .manager
                .remove_now(hook_id)
                .and_then(|e| e.as_hook().and_then(|h| h.carried));
            // Do not leave a captive locked forever
            if let Some(carried) = carried {
                if let Some(entity) = self.manager.get_mut(carried) {
                    let at = entity.position;
                    match &mut entity.kind {
                        EntityKind::Avatar(avatar) => avatar.release(at),
                        EntityKind::Mine(mine) => mine.release(),
                        _ => {}
                    }
                }
            }
        }

        self.manager.remove_now(avatar_id);
        info!(%player_id, entity = avatar_id, "player left simulation");
        true
    }

    // =========================================================================
    // INTENTS
    // =========================================================================

    /// Apply one player intent.
    pub fn handle_input(&mut self, player_id: PlayerId, intent: Intent) -> Result<(), SimulationError> {
        intent.validate()?;
        let id = self.avatar_of(player_id).ok_or(SimulationError::UnknownPlayer(player_id))?;
        debug!(%player_id, intent = intent.name(), "intent");

        match intent {
            Intent::Move { x, y } => {
                if let Some(avatar) = self.avatar_mut(id) {
                    avatar.pending_pickup = None;
                    avatar.set_target(Vec2::new(x, y));
                }
            }
            Intent::Hook { x, y } => {
                if hook::cast(&mut self.manager, id, Vec2::new(x, y)).is_none() {
                    debug!(%player_id, "hook cast rejected");
                }
            }
            Intent::Rot => {
                if let Some(avatar) = self.avatar_mut(id) {
                    avatar.toggle_rot();
                }
            }
            Intent::Upgrade { upgrade_type } => {
                if let Some(avatar) = self.avatar_mut(id) {
                    items::buy_upgrade(avatar, upgrade_type)?;
                }
            }
            Intent::BuyItem { item_id } => {
                if let Some(entity) = self.manager.get_mut(id) {
                    let position = entity.position;
                    if let Some(avatar) = entity.as_avatar_mut() {
                        items::buy_item(avatar, position, &self.map, item_id)?;
                    }
                }
            }
            Intent::UseItem { slot, x, y } => {
                items::use_item(&mut self.manager, &self.map, id, slot, Vec2::new(x, y))?;
            }
            Intent::Pickup { rune_id } => self.pickup(id, rune_id),
        }
        Ok(())
    }

    fn avatar_mut(&mut self, id: EntityId) -> Option<&mut Avatar> {
        self.manager.get_mut(id).and_then(|e| e.as_avatar_mut())
    }

    fn pickup(&mut self, avatar_id: EntityId, rune_id: EntityId) {
        let outcome = rune::try_pickup(&mut self.manager, avatar_id, rune_id);
        let Some(avatar) = self.avatar_mut(avatar_id) else {
            return;
        };
        match outcome {
            Some(Pickup::Collected(rune_type)) => {
                avatar.pending_pickup = None;
                debug!(avatar = avatar_id, rune = rune_id, ?rune_type, "rune collected");
            }
            Some(Pickup::OutOfRange(at)) => {
                if avatar.set_target(at) {
                    avatar.pending_pickup = Some(rune_id);
                }
            }
            None => avatar.pending_pickup = None,
        }
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Advance the world by `dt` seconds (clamped) and build the broadcast.
    pub fn tick(&mut self, dt: f32) -> GameStateUpdate {
        let dt = dt.clamp(0.0, MAX_TICK_DT);

        self.pre_pass(dt);
        self.manager.tick(dt, &self.map, &mut self.rng, &mut self.explosions);
        self.rules.tick(dt, &mut self.manager, &self.map, &mut self.rng);
        self.ticks += 1;

        self.snapshot()
    }

    fn pre_pass(&mut self, dt: f32) {
        let mut pickups = Vec::new();
        let mut hooks = Vec::new();

        for entity in self.manager.iter() {
            if let Some(avatar) = entity.as_avatar() {
                if let Some(hook_id) = avatar.active_hook {
                    hooks.push((entity.id, hook_id));
                }
                if let Some(rune_id) = avatar.pending_pickup {
                    let in_range = self
                        .manager
                        .get(rune_id)
                        .map(|rune| rune.position.distance(entity.position) <= RUNE_PICKUP_RANGE);
                    pickups.push((entity.id, rune_id, in_range));
                }
            }
        }

        // Hooks that vanished without cleaning up after themselves
        for (avatar_id, hook_id) in hooks {
            let exists = self.manager.get_mut(hook_id).is_some_and(|e| e.as_hook().is_some());
            if !exists {
                if let Some(avatar) = self.avatar_mut(avatar_id) {
                    avatar.active_hook = None;
                }
            }
        }

        for (avatar_id, rune_id, in_range) in pickups {
            match in_range {
                Some(true) => self.pickup(avatar_id, rune_id),
                Some(false) => {}
                None => {
                    if let Some(avatar) = self.avatar_mut(avatar_id) {
                        avatar.pending_pickup = None;
                    }
                }
            }
        }

        let map = &self.map;
        for entity in self.manager.iter_mut() {
            let position = entity.position;
            if let Some(avatar) = entity.as_avatar_mut() {
                avatar.on_healing_tile = map.is_healing(position, avatar.team);
                for owned in &mut avatar.items {
                    owned.cooldown = (owned.cooldown - dt).max(0.0);
                }
            }
        }
    }

    fn snapshot(&mut self) -> GameStateUpdate {
        GameStateUpdate {
            rules: self.rules.summary(),
            server_time: chrono::Utc::now().timestamp_millis(),
            tick: self.ticks,
            entities: self.manager.iter_mut().map(|e| e.snapshot()).collect(),
            explosions: std::mem::take(&mut self.explosions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::avatar::AvatarState;
    use crate::game::entity::DamageSource;
    use crate::game::items::ItemKind;
    use crate::game::mine::Mine;
    use crate::game::rune::{Rune, RuneType};
    use uuid::Uuid;

    const DT: f32 = 1.0 / 30.0;

    fn duel() -> (Simulation, PlayerId, PlayerId) {
        let mut sim = Simulation::new(42);
        let red = Uuid::new_v4();
        let blue = Uuid::new_v4();
        sim.add_player(red, Team::Red).unwrap();
        sim.add_player(blue, Team::Blue).unwrap();
        sim.tick(DT);
        (sim, red, blue)
    }

    fn place(sim: &mut Simulation, player: PlayerId, at: Vec2) {
        let id = sim.avatar_of(player).unwrap();
        let entity = sim.manager.get_mut(id).unwrap();
        entity.position = at;
        entity.as_avatar_mut().unwrap().stop(at);
    }

    fn avatar(sim: &Simulation, player: PlayerId) -> &Avatar {
        let id = sim.avatar_of(player).unwrap();
        sim.entities().get(id).and_then(|e| e.as_avatar()).unwrap()
    }

    #[test]
    fn test_two_players_start_match() {
        let mut sim = Simulation::new(1);
        sim.add_player(Uuid::new_v4(), Team::Red).unwrap();
        assert!(!sim.rules().summary().is_playing);

        sim.add_player(Uuid::new_v4(), Team::Blue).unwrap();
        let summary = sim.rules().summary();
        assert!(summary.is_playing);
        assert_eq!((summary.red_score, summary.blue_score), (0, 0));
        assert_eq!(summary.time_remaining, 300.0);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let mut sim = Simulation::new(1);
        let p = Uuid::new_v4();
        sim.add_player(p, Team::Red).unwrap();
        assert_eq!(sim.add_player(p, Team::Blue), Err(SimulationError::AlreadyJoined(p)));
    }

    #[test]
    fn test_spawn_slots_do_not_overlap() {
        let mut sim = Simulation::new(1);
        let a = sim.add_player(Uuid::new_v4(), Team::Red).unwrap();
        let b = sim.add_player(Uuid::new_v4(), Team::Red).unwrap();
        let pa = sim.manager.get_mut(a).unwrap().position;
        let pb = sim.manager.get_mut(b).unwrap().position;
        assert_ne!(pa, pb);
    }

    #[test]
    fn test_move_intent() {
        let (mut sim, red, _) = duel();
        let start = sim.entities().get(sim.avatar_of(red).unwrap()).unwrap().position;
        sim.handle_input(red, Intent::Move { x: start.x + 200.0, y: start.y }).unwrap();
        for _ in 0..10 {
            sim.tick(DT);
        }
        let now = sim.entities().get(sim.avatar_of(red).unwrap()).unwrap().position;
        assert!(now.x > start.x + 50.0);
    }

    #[test]
    fn test_unknown_player_rejected() {
        let (mut sim, _, _) = duel();
        let stranger = Uuid::new_v4();
        assert_eq!(
            sim.handle_input(stranger, Intent::Rot),
            Err(SimulationError::UnknownPlayer(stranger))
        );
    }

    #[test]
    fn test_hook_hit_scenario() {
        let (mut sim, red, blue) = duel();
        place(&mut sim, red, Vec2::new(300.0, 300.0));
        place(&mut sim, blue, Vec2::new(500.0, 300.0));
        sim.tick(DT);

        sim.handle_input(red, Intent::Hook { x: 500.0, y: 300.0 }).unwrap();
        let mut hooked = false;
        for _ in 0..20 {
            sim.tick(DT);
            if avatar(&sim, blue).state == AvatarState::Hooked {
                hooked = true;
                break;
            }
        }
        assert!(hooked);
        assert_eq!(avatar(&sim, blue).health, 75.0);
    }

    #[test]
    fn test_hook_owner_resolves_in_snapshot() {
        let (mut sim, red, _) = duel();
        place(&mut sim, red, Vec2::new(300.0, 300.0));
        sim.handle_input(red, Intent::Hook { x: 600.0, y: 300.0 }).unwrap();

        let update = sim.tick(DT);
        let hook = update
            .entities
            .iter()
            .find_map(|e| match e {
                EntitySnapshot::Hook(h) => Some(h.clone()),
                _ => None,
            })
            .unwrap();
        assert!(update
            .entities
            .iter()
            .any(|e| matches!(e, EntitySnapshot::Avatar(a) if a.id == hook.owner_id)));
    }

    #[test]
    fn test_mine_kill_does_not_score() {
        let (mut sim, red, blue) = duel();
        place(&mut sim, blue, Vec2::new(600.0, 300.0));
        let red_id = sim.avatar_of(red).unwrap();
        let mut mine = Mine::new(Team::Red, red_id);
        mine.arm_timer = 0.0;
        sim.manager.enqueue_add(Vec2::new(620.0, 300.0), EntityKind::Mine(mine));

        // Blue at 100 HP takes 150
        let update = sim.tick(DT);
        let victim = avatar(&sim, blue);
        assert_eq!(victim.health, 0.0);
        assert_eq!(victim.state, AvatarState::Dead);
        assert_eq!(update.explosions.len(), 1);
        assert_eq!(update.rules.red_score, 0);
        assert_eq!(update.rules.blue_score, 0);

        // Explosions are sent once
        let next = sim.tick(DT);
        assert!(next.explosions.is_empty());
    }

    #[test]
    fn test_kill_scores_via_tick() {
        let (mut sim, red, blue) = duel();
        let red_id = sim.avatar_of(red).unwrap();
        let blue_id = sim.avatar_of(blue).unwrap();
        if let Some(e) = sim.manager.get_mut(blue_id) {
            e.apply_damage(500.0, DamageSource::Player { attacker: red_id, team: Team::Red });
        }
        let update = sim.tick(DT);
        assert_eq!(update.rules.red_score, 1);
    }

    #[test]
    fn test_pickup_redirect_then_complete() {
        let (mut sim, red, _) = duel();
        place(&mut sim, red, Vec2::new(400.0, 160.0));
        let rune_id = sim.manager.enqueue_add(Vec2::new(560.0, 160.0), EntityKind::Rune(Rune::new(RuneType::Haste)));
        sim.tick(DT);

        sim.handle_input(red, Intent::Pickup { rune_id }).unwrap();
        assert_eq!(avatar(&sim, red).pending_pickup, Some(rune_id));
        assert_eq!(avatar(&sim, red).state, AvatarState::Moving);

        for _ in 0..30 {
            sim.tick(DT);
        }
        assert!(!sim.entities().contains(rune_id));
        assert_eq!(avatar(&sim, red).pending_pickup, None);
        assert!(avatar(&sim, red).status.haste > 0.0);
    }

    #[test]
    fn test_move_clears_pending_pickup() {
        let (mut sim, red, _) = duel();
        place(&mut sim, red, Vec2::new(300.0, 160.0));
        let rune_id = sim.manager.enqueue_add(Vec2::new(560.0, 160.0), EntityKind::Rune(Rune::new(RuneType::Heal)));
        sim.tick(DT);

        sim.handle_input(red, Intent::Pickup { rune_id }).unwrap();
        sim.handle_input(red, Intent::Move { x: 300.0, y: 300.0 }).unwrap();
        assert_eq!(avatar(&sim, red).pending_pickup, None);
    }

    #[test]
    fn test_remove_player_releases_captive() {
        let (mut sim, red, blue) = duel();
        place(&mut sim, red, Vec2::new(300.0, 300.0));
        place(&mut sim, blue, Vec2::new(420.0, 300.0));
        sim.tick(DT);

        sim.handle_input(red, Intent::Hook { x: 420.0, y: 300.0 }).unwrap();
        for _ in 0..6 {
            sim.tick(DT);
        }
        assert_eq!(avatar(&sim, blue).state, AvatarState::Hooked);

        assert!(sim.remove_player(red));
        assert!(!sim.remove_player(red));
        assert_eq!(avatar(&sim, blue).state, AvatarState::Idle);
        assert!(sim.entities().iter().all(|e| e.as_hook().is_none()));
    }

    #[test]
    fn test_buy_requires_shop() {
        let (mut sim, red, _) = duel();
        place(&mut sim, red, Vec2::new(600.0, 460.0));
        let err = sim.handle_input(red, Intent::BuyItem { item_id: ItemKind::Salve });
        assert_eq!(err, Err(SimulationError::Item(ItemError::NotNearShop)));
    }

    #[test]
    fn test_large_dt_is_clamped() {
        let (mut sim, red, _) = duel();
        place(&mut sim, red, Vec2::new(300.0, 460.0));
        sim.handle_input(red, Intent::Move { x: 700.0, y: 460.0 }).unwrap();
        sim.tick(5.0);
        let now = sim.entities().get(sim.avatar_of(red).unwrap()).unwrap().position;
        // At most MAX_TICK_DT worth of walking
        assert!(now.x <= 300.0 + 180.0 * MAX_TICK_DT + 1e-3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let (mut sim, _, _) = duel();
        let update = sim.tick(DT);
        let json = serde_json::to_value(&update).unwrap();
        assert!(json["serverTime"].as_i64().unwrap() > 0);
        assert_eq!(json["entities"].as_array().unwrap().len(), 2);
        assert_eq!(json["entities"][0]["kind"], "avatar");
        assert_eq!(json["rules"]["isPlaying"], true);
    }
}
