// Testing utilities for the domain layer
// This module is only available in tests or when the "mock" feature is enabled

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::clock::Clock;
use crate::entities::realtime::RealtimeEvent;
use crate::entities::user::{CreateUserRequest, User};
use crate::fixtures::Fixtures;
use crate::health::{ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth, SystemStatus};
use crate::services::{create_services, RealtimePublisher, Services};
use water_tracker_data::database::{create_in_memory_pool, DatabasePool};

/// A clock the test moves by hand
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Publisher that records every event instead of delivering it
#[derive(Default)]
pub struct RecordingPublisher {
    direct: Mutex<Vec<(String, RealtimeEvent)>>,
    broadcasts: Mutex<Vec<(String, RealtimeEvent)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events sent directly to a user, oldest first
    pub fn events_for(&self, user_id: &str) -> Vec<RealtimeEvent> {
        self.direct.lock().unwrap()
            .iter()
            .filter(|(target, _)| target == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Events broadcast on a channel, oldest first
    pub fn broadcasts_on(&self, channel: &str) -> Vec<RealtimeEvent> {
        self.broadcasts.lock().unwrap()
            .iter()
            .filter(|(target, _)| target == channel)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl RealtimePublisher for RecordingPublisher {
    async fn send_to_user(&self, user_id: &str, event: RealtimeEvent) {
        self.direct.lock().unwrap().push((user_id.to_string(), event));
    }

    async fn broadcast(&self, channel: &str, event: RealtimeEvent) {
        self.broadcasts.lock().unwrap().push((channel.to_string(), event));
    }
}

/// Services on a private in-memory database with a manual clock
pub struct TestContext {
    pub services: Services,
    pub publisher: Arc<RecordingPublisher>,
    pub clock: Arc<ManualClock>,
    pub pool: DatabasePool,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Context frozen at 2024-06-15 12:00 UTC
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        let pool = create_in_memory_pool().expect("failed to create in-memory database");
        let publisher = Arc::new(RecordingPublisher::new());
        let clock = Arc::new(ManualClock::new(instant));
        let fixtures = Arc::new(Fixtures::embedded().expect("embedded fixtures must parse"));

        let services = create_services(Some(pool.clone()), publisher.clone(), clock.clone(), fixtures);
        Self { services, publisher, clock, pool }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Register a user with default settings
    pub async fn create_user(&self, username: &str) -> User {
        self.services.users
            .create_user(CreateUserRequest {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                daily_goal_ml: None,
            })
            .await
            .expect("failed to create test user")
    }
}

/// Health service reporting a fixed status
#[derive(Debug)]
pub struct MockHealthService {
    status: SystemStatus,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    pub fn new() -> Self {
        Self { status: SystemStatus::Healthy }
    }

    /// Configure the mock to report the given status
    pub fn with_status(status: SystemStatus) -> Self {
        Self { status }
    }

    fn database_component(&self) -> HealthComponent {
        match self.status {
            SystemStatus::Healthy => HealthComponent { status: ComponentStatus::Healthy, details: None },
            SystemStatus::Degraded => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Mock database is degraded".to_string()),
            },
            SystemStatus::Unhealthy => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some("Mock database is down".to_string()),
            },
        }
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        SystemHealth {
            status: self.status,
            components: vec![("database".to_string(), self.database_component())].into_iter().collect(),
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        match self.status {
            SystemStatus::Healthy => Ok(true),
            SystemStatus::Degraded => Ok(false),
            SystemStatus::Unhealthy => Err("Mock database is down".to_string()),
        }
    }
}
