//! WebSocket Game Server
//!
//! Async WebSocket server for multiplayer connections.
//! Assigns each connection a player id and routes its messages to rooms.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::game::entity::{PlayerId, Team};
use crate::network::protocol::{ClientMessage, RoomId, ServerMessage};
use crate::network::room::{RoomConfig, RoomError, RoomManager};

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE: usize = 64;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Tick rate for room simulations (Hz).
    pub tick_rate: u32,
    /// Players per room.
    pub room_capacity: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            tick_rate: crate::TICK_RATE,
            room_capacity: 2,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `ARENA_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or("ARENA_BIND_ADDR", defaults.bind_addr),
            max_connections: env_or("ARENA_MAX_CONNECTIONS", defaults.max_connections),
            tick_rate: env_or("ARENA_TICK_RATE", defaults.tick_rate).max(1),
            room_capacity: env_or("ARENA_ROOM_CAPACITY", defaults.room_capacity).max(1),
            version: defaults.version,
        }
    }

    fn room_config(&self) -> RoomConfig {
        RoomConfig {
            capacity: self.room_capacity,
            tick_rate: self.tick_rate,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring invalid config value");
            default
        }),
        Err(_) => default,
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Player identifier assigned on connect.
    player_id: PlayerId,
    /// Connection time.
    connected_at: Instant,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Rooms and room membership.
    rooms: Arc<RoomManager>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let rooms = Arc::new(RoomManager::new(config.room_config()));

        Self {
            config,
            rooms,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server v{} listening on {}", self.config.version, self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on `listener` until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.rooms.shutdown("Server shutting down").await;
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let rooms = self.rooms.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);
            let player_id = PlayerId::new_v4();

            // Register client
            clients.write().await.insert(addr, ConnectedClient {
                player_id,
                connected_at: Instant::now(),
            });
            debug!(%addr, %player_id, "client registered");

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        warn!("Invalid message from {}: {}", addr, e);
                                        continue;
                                    }
                                };

                                if let Some(reply) = handle_client_message(player_id, client_msg, &rooms, &msg_tx).await {
                                    if msg_tx.send(reply).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            rooms.leave_room(player_id).await;
            drop(msg_tx);
            let _ = sender_task.await;

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} cleaned up after {:.1}s",
                    addr,
                    client.connected_at.elapsed().as_secs_f32()
                );
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get active room count.
    pub async fn room_count(&self) -> usize {
        self.rooms.room_count().await
    }

    /// Player id assigned to a connection.
    pub async fn player_at(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients.read().await.get(&addr).map(|c| c.player_id)
    }
}

/// Apply one client message. Returns the direct reply, if any.
///
/// Room failures become `ERROR` replies; rejected intents are only logged.
async fn handle_client_message(
    player_id: PlayerId,
    msg: ClientMessage,
    rooms: &RoomManager,
    sender: &mpsc::Sender<ServerMessage>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::GetRooms => Some(ServerMessage::RoomList {
            rooms: rooms.list_rooms().await,
        }),
        ClientMessage::CreateRoom { name } => Some(joined_or_error(
            player_id,
            rooms.create_room(name, player_id, sender.clone()).await,
        )),
        ClientMessage::JoinRoom { room_id } => Some(joined_or_error(
            player_id,
            rooms.join_room(room_id, player_id, sender.clone()).await,
        )),
        ClientMessage::LeaveRoom => {
            rooms.leave_room(player_id).await;
            Some(ServerMessage::RoomLeft)
        }
        ClientMessage::Input { input } => {
            match rooms.route_input(player_id, input).await {
                Ok(()) | Err(RoomError::NotInRoom) => {}
                Err(e) => debug!(%player_id, "input rejected: {}", e),
            }
            None
        }
    }
}

fn joined_or_error(
    player_id: PlayerId,
    result: Result<(RoomId, Team), RoomError>,
) -> ServerMessage {
    match result {
        Ok((room_id, team)) => ServerMessage::RoomJoined { room_id, team, player_id },
        Err(e) => ServerMessage::error(e.to_string()),
    }
}
