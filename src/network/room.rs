//! Room Orchestration
//!
//! A room owns one simulation, its members' outbound channels and the tick
//! loop that drives it. The `RoomManager` maps players to rooms; a room is
//! closed, and its loop stopped, as soon as its last member leaves. A closed
//! room refuses joins even through a handle fetched before it closed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::core::rng::derive_room_seed;
use crate::game::entity::{PlayerId, Team};
use crate::game::input::Intent;
use crate::game::simulation::{Simulation, SimulationError};
use crate::network::protocol::{RoomId, RoomInfo, ServerMessage};
use crate::network::scheduler::TickScheduler;

/// Room sizing and pacing.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Max members per room
    pub capacity: usize,
    /// Ticks per second
    pub tick_rate: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            tick_rate: crate::TICK_RATE,
        }
    }
}

/// Room errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RoomError {
    /// No room with that id.
    #[error("Room not found")]
    NotFound,

    /// Room at capacity.
    #[error("Room is full")]
    Full,

    /// Sender is not in a room.
    #[error("Not in a room")]
    NotInRoom,

    /// Rejected by the simulation.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// One connected member.
#[derive(Debug)]
struct RoomMember {
    team: Team,
    sender: mpsc::Sender<ServerMessage>,
}

/// A running game room.
pub struct Room {
    id: RoomId,
    name: String,
    capacity: usize,
    members: BTreeMap<PlayerId, RoomMember>,
    /// Slots held for players switching in from another room
    reserved: BTreeSet<PlayerId>,
    closed: bool,
    simulation: Simulation,
    scheduler: TickScheduler,
}

impl Room {
    /// Empty room with a seed derived from its id.
    pub fn new(id: RoomId, name: String, capacity: usize) -> Self {
        let created_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seed = derive_room_seed(id.as_bytes(), created_nanos);
        debug!(room = %id, seed, "room seeded");

        Self {
            id,
            name,
            capacity,
            members: BTreeMap::new(),
            reserved: BTreeSet::new(),
            closed: false,
            simulation: Simulation::new(seed),
            scheduler: TickScheduler::new(),
        }
    }

    /// Room id.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Member count.
    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    /// No members and no held slots?
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.reserved.is_empty()
    }

    /// At capacity, counting held slots?
    pub fn is_full(&self) -> bool {
        self.members.len() + self.reserved.len() >= self.capacity
    }

    /// Closed rooms accept no one.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The room's world.
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Listing entry.
    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            current_players: self.members.len(),
            capacity: self.capacity,
            is_playing: self.simulation.rules().summary().is_playing,
        }
    }

    /// Team with fewer members, Red on ties.
    fn pick_team(&self) -> Team {
        let red = self.members.values().filter(|m| m.team == Team::Red).count();
        let blue = self.members.len() - red;
        if blue < red {
            Team::Blue
        } else {
            Team::Red
        }
    }

    /// Add a member and spawn its avatar. Consumes a slot held by `reserve`.
    pub fn join(&mut self, player_id: PlayerId, sender: mpsc::Sender<ServerMessage>) -> Result<Team, RoomError> {
        if self.closed {
            return Err(RoomError::NotFound);
        }
        if let Some(member) = self.members.get(&player_id) {
            return Ok(member.team);
        }
        self.reserved.remove(&player_id);
        if self.is_full() {
            return Err(RoomError::Full);
        }

        let team = self.pick_team();
        self.simulation.add_player(player_id, team)?;
        self.members.insert(player_id, RoomMember { team, sender });
        info!(room = %self.id, %player_id, team = team.label(), players = self.members.len(), "player joined room");
        Ok(team)
    }

    /// Hold a slot for a player who has yet to leave another room.
    pub fn reserve(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.closed {
            return Err(RoomError::NotFound);
        }
        if self.members.contains_key(&player_id) || self.reserved.contains(&player_id) {
            return Ok(());
        }
        if self.is_full() {
            return Err(RoomError::Full);
        }
        self.reserved.insert(player_id);
        Ok(())
    }

    /// Drop a held slot.
    pub fn release(&mut self, player_id: PlayerId) {
        self.reserved.remove(&player_id);
    }

    /// Remove a member and its avatar. Returns false if it was not here.
    pub fn leave(&mut self, player_id: PlayerId) -> bool {
        if self.members.remove(&player_id).is_none() {
            return false;
        }
        self.simulation.remove_player(player_id);
        info!(room = %self.id, %player_id, players = self.members.len(), "player left room");
        true
    }

    /// Apply an intent from a member.
    pub fn handle_input(&mut self, player_id: PlayerId, intent: Intent) -> Result<(), RoomError> {
        Ok(self.simulation.handle_input(player_id, intent)?)
    }

    /// Advance one tick and broadcast the result.
    pub fn tick(&mut self, dt: f32) {
        let update = self.simulation.tick(dt);
        self.broadcast(ServerMessage::GameState(update));
    }

    /// Send to every member without waiting. Slow receivers miss updates.
    pub fn broadcast(&self, message: ServerMessage) {
        for (player_id, member) in &self.members {
            if let Err(mpsc::error::TrySendError::Full(_)) = member.sender.try_send(message.clone()) {
                debug!(room = %self.id, %player_id, "outbound queue full, dropping update");
            }
        }
    }

    /// Start the tick loop. The loop holds only a weak reference and ends
    /// when the room is dropped.
    pub fn start(room: &Arc<RwLock<Room>>, scheduler: &mut TickScheduler, tick_rate: u32) {
        let weak: Weak<RwLock<Room>> = Arc::downgrade(room);
        scheduler.start(tick_rate, move |dt| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(room) => {
                        room.write().await.tick(dt);
                        true
                    }
                    None => false,
                }
            }
        });
    }

    /// Stop the tick loop. Idempotent.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Close and stop the room once nobody is in it or on the way in.
    /// Returns true if the room is closed.
    pub fn close_if_empty(&mut self) -> bool {
        if !self.closed && self.is_empty() {
            self.closed = true;
            self.stop();
        }
        self.closed
    }

    /// Is the tick loop running?
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}

// =============================================================================
// ROOM MANAGER
// =============================================================================

/// All rooms on this server.
pub struct RoomManager {
    config: RoomConfig,
    rooms: RwLock<BTreeMap<RoomId, Arc<RwLock<Room>>>>,
    player_rooms: RwLock<BTreeMap<PlayerId, RoomId>>,
}

impl RoomManager {
    /// Empty manager.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(BTreeMap::new()),
            player_rooms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Listing of all rooms.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let rooms = self.rooms.read().await;
        let mut infos = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            infos.push(room.read().await.info());
        }
        infos
    }

    /// Number of rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Room a player is in.
    pub async fn room_of(&self, player_id: PlayerId) -> Option<RoomId> {
        self.player_rooms.read().await.get(&player_id).copied()
    }

    /// Room by id.
    pub async fn get_room(&self, room_id: RoomId) -> Option<Arc<RwLock<Room>>> {
        self.rooms.read().await.get(&room_id).cloned()
    }

    /// Create a room, start its loop and join the creator to it.
    pub async fn create_room(
        &self,
        name: String,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(RoomId, Team), RoomError> {
        let id = RoomId::new_v4();
        let name = display_name(name, id);
        let room = Arc::new(RwLock::new(Room::new(id, name.clone(), self.config.capacity)));
        {
            let mut guard = room.write().await;
            Room::start(&room, &mut guard.scheduler, self.config.tick_rate);
        }
        self.rooms.write().await.insert(id, room);
        info!(room = %id, %name, "room created");

        self.join_room(id, player_id, sender).await
    }

    /// Join a room, leaving any other room first.
    pub async fn join_room(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(RoomId, Team), RoomError> {
        let room = self.get_room(room_id).await.ok_or(RoomError::NotFound)?;

        let switching = matches!(self.room_of(player_id).await, Some(current) if current != room_id);
        if switching {
            // Hold the target slot before giving up the current room
            room.write().await.reserve(player_id)?;
            self.leave_room(player_id).await;
        }

        let joined = room.write().await.join(player_id, sender);
        match joined {
            Ok(team) => {
                self.player_rooms.write().await.insert(player_id, room_id);
                Ok((room_id, team))
            }
            Err(e) => {
                if switching {
                    let closed = {
                        let mut guard = room.write().await;
                        guard.release(player_id);
                        guard.close_if_empty()
                    };
                    if closed {
                        self.remove_closed(room_id).await;
                    }
                }
                Err(e)
            }
        }
    }

    /// Leave the current room, destroying it if it empties.
    ///
    /// Returns the room left, or `None` if the player was in no room.
    pub async fn leave_room(&self, player_id: PlayerId) -> Option<RoomId> {
        let room_id = self.player_rooms.write().await.remove(&player_id)?;
        let Some(room) = self.get_room(room_id).await else {
            warn!(room = %room_id, %player_id, "player mapped to missing room");
            return None;
        };

        let closed = {
            let mut guard = room.write().await;
            guard.leave(player_id);
            guard.close_if_empty()
        };

        if closed {
            self.remove_closed(room_id).await;
        }
        Some(room_id)
    }

    async fn remove_closed(&self, room_id: RoomId) {
        if self.rooms.write().await.remove(&room_id).is_some() {
            info!(room = %room_id, "room destroyed");
        }
    }

    /// Forward an intent to the sender's room.
    pub async fn route_input(&self, player_id: PlayerId, intent: Intent) -> Result<(), RoomError> {
        let room_id = self.room_of(player_id).await.ok_or(RoomError::NotInRoom)?;
        let room = self.get_room(room_id).await.ok_or(RoomError::NotFound)?;
        let mut guard = room.write().await;
        guard.handle_input(player_id, intent)
    }

    /// Stop every room's loop and drop all rooms.
    pub async fn shutdown(&self, reason: &str) {
        let rooms = std::mem::take(&mut *self.rooms.write().await);
        self.player_rooms.write().await.clear();
        for room in rooms.values() {
            let mut guard = room.write().await;
            guard.broadcast(ServerMessage::Shutdown { reason: reason.to_string() });
            guard.closed = true;
            guard.stop();
        }
        info!(rooms = rooms.len(), "rooms shut down");
    }
}

/// Trimmed room name, or a short name derived from the id.
fn display_name(name: String, id: RoomId) -> String {
    let trimmed = name.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(32).collect();
    }
    let short = id.simple().to_string();
    format!("Room {}", &short[..6])
}
