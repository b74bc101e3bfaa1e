// WaterTracker Domain
// This crate contains the business logic for the WaterTracker application

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Static JSON fixtures (report layouts, insight rules, templates, GDPR policies)
pub mod fixtures;

// Time source used by the services
pub mod clock;

// Re-export the database module from the data crate for convenience
pub use water_tracker_data::database;

// Testing utilities - only available in tests or with the mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
