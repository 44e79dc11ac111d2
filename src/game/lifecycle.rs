//! Entity Lifecycle Manager
//!
//! Owns the live entity collection of one room. Additions and removals are
//! buffered and only applied at tick boundaries:
//!
//! 1. flush pending additions into the live list
//! 2. update every live entity once (in insertion order)
//! 3. flush pending removals
//!
//! An entity added during step 2 is first updated on the next tick; an
//! entity removed during step 2 still finishes the current tick.

use tracing::{debug, warn};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::entity::{Entity, EntityError, EntityId, EntityKind};
use crate::game::events::Explosion;
use crate::game::map::ArenaMap;

// =============================================================================
// PENDING CHANGES
// =============================================================================

/// Buffered structural changes, applied at the next tick boundary.
#[derive(Debug)]
pub struct PendingChanges {
    next_id: EntityId,
    adds: Vec<Entity>,
    removes: Vec<EntityId>,
}

impl PendingChanges {
    fn new() -> Self {
        Self {
            next_id: 1,
            adds: Vec::new(),
            removes: Vec::new(),
        }
    }

    /// Queue a new entity. Its id is allocated immediately.
    pub fn spawn(&mut self, position: Vec2, kind: EntityKind) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.adds.push(Entity::new(id, position, kind));
        id
    }

    /// Queue an entity for removal at the end of the current tick.
    pub fn remove(&mut self, id: EntityId) {
        if !self.removes.contains(&id) {
            self.removes.push(id);
        }
    }

    /// Has this id been queued for removal?
    pub fn is_removing(&self, id: EntityId) -> bool {
        self.removes.contains(&id)
    }
}

// =============================================================================
// TICK CONTEXT
// =============================================================================

/// Everything an entity update may touch besides itself and its peers.
pub struct TickContext<'a> {
    /// Seconds simulated this tick
    pub dt: f32,
    /// Arena geometry
    pub map: &'a ArenaMap,
    /// Room generator
    pub rng: &'a mut DeterministicRng,
    /// Explosions to report in the next snapshot
    pub explosions: &'a mut Vec<Explosion>,
    /// Deferred add/remove queues
    pub pending: &'a mut PendingChanges,
}

/// All live entities except the one being updated.
pub struct Peers<'a> {
    before: &'a mut [Entity],
    after: &'a mut [Entity],
}

impl<'a> Peers<'a> {
    /// Split view around a single entity.
    pub fn new(before: &'a mut [Entity], after: &'a mut [Entity]) -> Self {
        Self { before, after }
    }

    /// Peer by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.iter().find(|e| e.id == id)
    }

    /// Mutable peer by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.iter_mut().find(|e| e.id == id)
    }

    /// Iterate peers in live order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.before.iter().chain(self.after.iter())
    }

    /// Mutably iterate peers in live order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.before.iter_mut().chain(self.after.iter_mut())
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Live entities of one room plus their pending changes.
#[derive(Debug)]
pub struct EntityManager {
    live: Vec<Entity>,
    pending: PendingChanges,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            pending: PendingChanges::new(),
        }
    }

    /// Queue an entity for addition at the start of the next tick.
    pub fn enqueue_add(&mut self, position: Vec2, kind: EntityKind) -> EntityId {
        self.pending.spawn(position, kind)
    }

    /// Queue an entity for removal at the end of the next tick.
    pub fn enqueue_remove(&mut self, id: EntityId) {
        self.pending.remove(id);
    }

    /// Remove an entity between ticks, without waiting for a boundary.
    ///
    /// Only call this outside `tick`; returns the removed entity.
    pub fn remove_now(&mut self, id: EntityId) -> Option<Entity> {
        if let Some(idx) = self.pending.adds.iter().position(|e| e.id == id) {
            return Some(self.pending.adds.remove(idx));
        }
        let idx = self.live.iter().position(|e| e.id == id)?;
        Some(self.live.remove(idx))
    }

    /// Live entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.live.iter().find(|e| e.id == id)
    }

    /// Entity by id, including ones still waiting to be added.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.live
            .iter_mut()
            .chain(self.pending.adds.iter_mut())
            .find(|e| e.id == id)
    }

    /// Is this id live (not merely pending)?
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Live entities in update order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.live.iter()
    }

    /// Mutable live entities in update order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.live.iter_mut()
    }

    /// Live entities plus pending additions.
    pub fn iter_all(&self) -> impl Iterator<Item = &Entity> {
        self.live.iter().chain(self.pending.adds.iter())
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// No live entities?
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Is this id queued for removal?
    pub fn is_removing(&self, id: EntityId) -> bool {
        self.pending.is_removing(id)
    }

    /// Run one lifecycle tick.
    pub fn tick(
        &mut self,
        dt: f32,
        map: &ArenaMap,
        rng: &mut DeterministicRng,
        explosions: &mut Vec<Explosion>,
    ) {
        self.run_tick(dt, map, rng, explosions, |entity, ctx, peers| entity.update(ctx, peers));
    }

    fn run_tick<F>(
        &mut self,
        dt: f32,
        map: &ArenaMap,
        rng: &mut DeterministicRng,
        explosions: &mut Vec<Explosion>,
        mut update: F,
    ) where
        F: FnMut(&mut Entity, &mut TickContext<'_>, &mut Peers<'_>) -> Result<(), EntityError>,
    {
        self.flush_adds();

        for idx in 0..self.live.len() {
            let (before, rest) = self.live.split_at_mut(idx);
            let Some((entity, after)) = rest.split_first_mut() else {
                break;
            };

            let mut peers = Peers::new(before, after);
            let mut ctx = TickContext {
                dt,
                map,
                rng: &mut *rng,
                explosions: &mut *explosions,
                pending: &mut self.pending,
            };

            if let Err(err) = update(entity, &mut ctx, &mut peers) {
                warn!(entity = entity.id, kind = entity.kind_name(), %err, "entity update failed, removing");
                self.pending.remove(entity.id);
            }
        }

        self.flush_removes();
    }

    fn flush_adds(&mut self) {
        if !self.pending.adds.is_empty() {
            debug!(count = self.pending.adds.len(), "adding entities");
            self.live.append(&mut self.pending.adds);
        }
    }

    fn flush_removes(&mut self) {
        if self.pending.removes.is_empty() {
            return;
        }
        let removes = std::mem::take(&mut self.pending.removes);
        self.live.retain(|e| !removes.contains(&e.id));
        // Spawned and removed within the same tick: never becomes live
        self.pending.adds.retain(|e| !removes.contains(&e.id));
    }
}
