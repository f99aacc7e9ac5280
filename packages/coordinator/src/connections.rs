use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::extract::ws::Message;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use shared::models::events::ServerEvent;
use shared::services::notifier::ConnectionNotifier;

/// Live handle to one WebSocket: its id plus the channel the writer task
/// drains.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub connection_id: String,
    pub sender: UnboundedSender<Message>,
}

/// Maps an authenticated player to their current connection. Process-lifetime
/// state only; nothing here is persisted.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last connection wins: a reconnect silently replaces the old mapping.
    pub fn register(&self, player_id: &str, handle: ConnectionHandle) {
        self.connections
            .write()
            .unwrap()
            .insert(player_id.to_string(), handle);
    }

    /// Removes the mapping only while it still points at `connection_id`,
    /// so a stale disconnect cannot evict a fresh reconnect.
    pub fn unregister(&self, player_id: &str, connection_id: &str) {
        let mut connections = self.connections.write().unwrap();
        if let Some(handle) = connections.get(player_id) {
            if handle.connection_id == connection_id {
                connections.remove(player_id);
            }
        }
    }

    pub fn lookup(&self, player_id: &str) -> Option<ConnectionHandle> {
        self.connections.read().unwrap().get(player_id).cloned()
    }

    pub fn online_count(&self) -> usize {
        self.connections.read().unwrap().len()
    }
}

/// Event Broadcaster: resolves the player's current connection at send time
/// and pushes the serialized event. An offline player is skipped; delivery
/// problems never become pipeline errors.
pub struct WsNotifier {
    registry: Arc<ConnectionRegistry>,
}

impl WsNotifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        WsNotifier { registry }
    }
}

#[async_trait]
impl ConnectionNotifier for WsNotifier {
    async fn send_to_player(&self, player_id: &str, event: &ServerEvent) {
        let Some(handle) = self.registry.lookup(player_id) else {
            debug!("Player {} is not connected, skipping notification", player_id);
            return;
        };

        match serde_json::to_string(event) {
            Ok(payload) => {
                if handle.sender.send(Message::Text(payload)).is_err() {
                    debug!("Connection {} already closed", handle.connection_id);
                }
            }
            Err(err) => error!("Failed to serialize event: {}", err),
        }
    }
}
