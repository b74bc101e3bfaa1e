use async_trait::async_trait;
use tracing::debug;

use crate::entities::realtime::RealtimeEvent;

/// Outbound real-time channel.
///
/// The api crate implements this on top of its WebSocket connection manager.
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Deliver to every live connection of one user
    async fn send_to_user(&self, user_id: &str, event: RealtimeEvent);

    /// Deliver to every subscriber of a channel
    async fn broadcast(&self, channel: &str, event: RealtimeEvent);
}

/// Publisher that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl RealtimePublisher for NoopPublisher {
    async fn send_to_user(&self, user_id: &str, _event: RealtimeEvent) {
        debug!("Dropping real-time event for user {}", user_id);
    }

    async fn broadcast(&self, channel: &str, _event: RealtimeEvent) {
        debug!("Dropping real-time broadcast on {}", channel);
    }
}
