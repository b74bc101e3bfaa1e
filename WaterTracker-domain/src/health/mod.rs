//! Domain layer health check functionality
//! This module provides health check services for the application

use std::collections::HashMap;
use async_trait::async_trait;
use water_tracker_data::database;

/// System health status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Component name to health
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Ok(true) when the database answers, Ok(false) when it runs on the
    /// in-memory fallback, Err when it cannot be reached
    async fn check_database_status(&self) -> Result<bool, String>;
}

/// Probe the application database with a trivial query
pub async fn check_database_status() -> Result<bool, String> {
    let pool = match database::get_db_pool() {
        Ok(pool) => pool,
        Err(e) => return Err(format!("Database connection error: {}", e)),
    };
    {
        // The in-memory pool has a single connection; release it before asking for info
        let conn = pool.get().map_err(|e| format!("Database connection error: {}", e))?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| format!("Database query failed: {}", e))?;
    }

    match database::get_connection_info() {
        Some(info) if info.contains("memory") => Ok(false),
        _ => Ok(true),
    }
}

/// Fold component statuses into the overall status
pub fn overall_status(components: &HashMap<String, HealthComponent>) -> SystemStatus {
    if components.values().any(|c| c.status == ComponentStatus::Unhealthy) {
        SystemStatus::Unhealthy
    } else if components.values().any(|c| c.status == ComponentStatus::Degraded) {
        SystemStatus::Degraded
    } else {
        SystemStatus::Healthy
    }
}

/// Get overall system health
pub async fn get_system_health() -> SystemHealth {
    let db_component = match check_database_status().await {
        Ok(true) => HealthComponent {
            status: ComponentStatus::Healthy,
            details: None,
        },
        Ok(false) => HealthComponent {
            status: ComponentStatus::Degraded,
            details: Some("Running on the in-memory database; data will not persist".to_string()),
        },
        Err(e) => HealthComponent {
            status: ComponentStatus::Unhealthy,
            details: Some(e),
        },
    };

    let components: HashMap<String, HealthComponent> = vec![
        ("database".to_string(), db_component),
    ].into_iter().collect();

    SystemHealth {
        status: overall_status(&components),
        components,
    }
}

/// Health service backed by the global database pool
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseHealthService;

#[async_trait]
impl HealthServiceTrait for DatabaseHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        get_system_health().await
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        check_database_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: ComponentStatus) -> HealthComponent {
        HealthComponent { status, details: None }
    }

    #[test]
    fn test_overall_status_takes_the_worst_component() {
        let mut components = HashMap::new();
        components.insert("database".to_string(), component(ComponentStatus::Healthy));
        assert_eq!(overall_status(&components), SystemStatus::Healthy);

        components.insert("fixtures".to_string(), component(ComponentStatus::Degraded));
        assert_eq!(overall_status(&components), SystemStatus::Degraded);

        components.insert("scheduler".to_string(), component(ComponentStatus::Unhealthy));
        assert_eq!(overall_status(&components), SystemStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_get_system_health() {
        let health = get_system_health().await;
        // Status depends on whether a pool was initialized in this process
        assert!(health.components.contains_key("database"));
    }

    #[test]
    fn test_mock_health_service_reports_configured_status() {
        use crate::testing::MockHealthService;

        let degraded = MockHealthService::with_status(SystemStatus::Degraded);
        let health = tokio_test::block_on(degraded.get_system_health());
        assert_eq!(health.status, SystemStatus::Degraded);
        tokio_test::assert_ok!(tokio_test::block_on(degraded.check_database_status()));

        let down = MockHealthService::with_status(SystemStatus::Unhealthy);
        tokio_test::assert_err!(tokio_test::block_on(down.check_database_status()));
    }
}
