use std::sync::Arc;

use water_tracker_domain::health::{DatabaseHealthService, HealthServiceTrait};
use water_tracker_domain::services::{create_default_services, RealtimePublisher, Services};

use crate::ws::ConnectionManager;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub health: Arc<dyn HealthServiceTrait + Send + Sync>,
    pub connections: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(
        services: Services,
        health: Arc<dyn HealthServiceTrait + Send + Sync>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        Self { services, health, connections }
    }

    /// Services on the application database, publishing through the WebSocket registry
    pub fn from_environment() -> Self {
        let connections = Arc::new(ConnectionManager::new());
        let publisher: Arc<dyn RealtimePublisher> = connections.clone();
        Self {
            services: create_default_services(publisher),
            health: Arc::new(DatabaseHealthService),
            connections,
        }
    }
}
