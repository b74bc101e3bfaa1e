use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use water_tracker_domain::entities::realtime::RealtimeEvent;
use water_tracker_domain::services::RealtimePublisher;

use crate::ws::messages::event_text;

/// Channel sender half for pushing frames to one WebSocket connection
pub type WsSender = mpsc::UnboundedSender<Message>;

struct WsConnection {
    sender: WsSender,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct Registry {
    /// user id -> connection id -> connection
    connections: HashMap<String, HashMap<String, WsConnection>>,
    /// channel -> subscribed user ids
    subscriptions: HashMap<String, HashSet<String>>,
}

/// Authenticated WebSocket connections and their channel subscriptions.
///
/// Subscriptions belong to users, not sockets: every live connection of a
/// subscribed user receives the channel's traffic, and a user's
/// subscriptions go away with their last connection.
#[derive(Default)]
pub struct ConnectionManager {
    registry: RwLock<Registry>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection
    pub async fn connect(&self, user_id: &str, conn_id: &str, sender: WsSender) {
        let mut registry = self.registry.write().await;
        let user_connections = registry.connections.entry(user_id.to_string()).or_default();
        user_connections.insert(conn_id.to_string(), WsConnection { sender, connected_at: Utc::now() });
        info!(user_id, conn_id, total = user_connections.len(), "WebSocket user connected");
    }

    /// Drop a connection; the user's last one also clears their subscriptions
    pub async fn disconnect(&self, user_id: &str, conn_id: &str) {
        let mut registry = self.registry.write().await;
        let Some(user_connections) = registry.connections.get_mut(user_id) else {
            return;
        };
        user_connections.remove(conn_id);
        if !user_connections.is_empty() {
            debug!(user_id, conn_id, "WebSocket connection closed, user still connected");
            return;
        }

        registry.connections.remove(user_id);
        registry.subscriptions.retain(|_, subscribers| {
            subscribers.remove(user_id);
            !subscribers.is_empty()
        });
        info!(user_id, "WebSocket user disconnected");
    }

    /// Subscribe a connected user; false when the user has no live connection
    pub async fn subscribe(&self, user_id: &str, channel: &str) -> bool {
        let mut registry = self.registry.write().await;
        if !registry.connections.contains_key(user_id) {
            return false;
        }
        registry.subscriptions.entry(channel.to_string()).or_default().insert(user_id.to_string());
        debug!(user_id, channel, "Subscribed");
        true
    }

    /// Returns whether the user was subscribed
    pub async fn unsubscribe(&self, user_id: &str, channel: &str) -> bool {
        let mut registry = self.registry.write().await;
        let Some(subscribers) = registry.subscriptions.get_mut(channel) else {
            return false;
        };
        let removed = subscribers.remove(user_id);
        if subscribers.is_empty() {
            registry.subscriptions.remove(channel);
        }
        removed
    }

    pub async fn is_connected(&self, user_id: &str) -> bool {
        self.registry.read().await.connections.contains_key(user_id)
    }

    /// Subscribers of a channel, sorted
    pub async fn subscribers(&self, channel: &str) -> Vec<String> {
        let registry = self.registry.read().await;
        let mut users: Vec<String> = registry
            .subscriptions
            .get(channel)
            .map(|subscribers| subscribers.iter().cloned().collect())
            .unwrap_or_default();
        users.sort();
        users
    }

    /// Channels a user is subscribed to, sorted
    pub async fn channels_of(&self, user_id: &str) -> Vec<String> {
        let registry = self.registry.read().await;
        let mut channels: Vec<String> = registry
            .subscriptions
            .iter()
            .filter(|(_, subscribers)| subscribers.contains(user_id))
            .map(|(channel, _)| channel.clone())
            .collect();
        channels.sort();
        channels
    }

    /// Send a text frame to every connection of a user; returns the number reached
    pub async fn send_text_to_user(&self, user_id: &str, text: &str) -> usize {
        let registry = self.registry.read().await;
        registry
            .connections
            .get(user_id)
            .map(|user_connections| Self::deliver(user_connections.values(), text))
            .unwrap_or(0)
    }

    /// Send a text frame to every connection of every subscriber
    pub async fn broadcast_text(&self, channel: &str, text: &str) -> usize {
        let registry = self.registry.read().await;
        let Some(subscribers) = registry.subscriptions.get(channel) else {
            return 0;
        };
        let connections = subscribers
            .iter()
            .filter_map(|user_id| registry.connections.get(user_id))
            .flat_map(|user_connections| user_connections.values());
        Self::deliver(connections, text)
    }

    fn deliver<'a>(connections: impl Iterator<Item = &'a WsConnection>, text: &str) -> usize {
        // A closed channel means the socket is going away; its task cleans up
        connections
            .filter(|connection| connection.sender.send(Message::Text(text.to_string())).is_ok())
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.values().map(HashMap::len).sum()
    }

    /// Age of the oldest live connection
    pub async fn oldest_connection(&self) -> Option<DateTime<Utc>> {
        let registry = self.registry.read().await;
        registry
            .connections
            .values()
            .flat_map(|user_connections| user_connections.values())
            .map(|connection| connection.connected_at)
            .min()
    }

    /// Send a Ping frame to every connection
    pub async fn ping_all(&self) {
        let registry = self.registry.read().await;
        for connection in registry.connections.values().flat_map(HashMap::values) {
            let _ = connection.sender.send(Message::Ping(Vec::new()));
        }
    }

    /// Send a Close frame to every connection and forget them all
    pub async fn shutdown_all(&self) {
        let mut registry = self.registry.write().await;
        let count: usize = registry.connections.values().map(HashMap::len).sum();
        for connection in registry.connections.values().flat_map(HashMap::values) {
            let _ = connection.sender.send(Message::Close(None));
        }
        registry.connections.clear();
        registry.subscriptions.clear();
        info!(count, "Closed all WebSocket connections");
    }
}

#[async_trait]
impl RealtimePublisher for ConnectionManager {
    async fn send_to_user(&self, user_id: &str, event: RealtimeEvent) {
        let reached = self.send_text_to_user(user_id, &event_text(&event)).await;
        debug!(user_id, reached, "Pushed real-time event");
    }

    async fn broadcast(&self, channel: &str, event: RealtimeEvent) {
        let reached = self.broadcast_text(channel, &event_text(&event)).await;
        debug!(channel, reached, "Broadcast real-time event");
    }
}
