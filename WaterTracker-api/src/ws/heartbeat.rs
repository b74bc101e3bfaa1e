use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ws::manager::ConnectionManager;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Ping every live connection on a fixed interval
pub fn start_heartbeat(connections: Arc<ConnectionManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            connections.ping_all().await;
            let count = connections.connection_count().await;
            let oldest_age_secs = connections
                .oldest_connection()
                .await
                .map(|connected_at| (Utc::now() - connected_at).num_seconds());
            debug!(count, ?oldest_age_secs, "WebSocket heartbeat");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_heartbeat_pings_connections() {
        let connections = Arc::new(ConnectionManager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        connections.connect("ana", "c1", tx).await;

        let handle = start_heartbeat(connections.clone(), Duration::from_millis(10));
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        handle.abort();

        assert!(matches!(message, Some(Message::Ping(_))));
    }
}
