pub mod health;
pub mod auth;
pub mod users;
pub mod water;
pub mod water_logs;
pub mod goals;
pub mod achievements;
pub mod notifications;
pub mod reminders;
pub mod social;
pub mod reports;
pub mod gdpr;
pub mod admin;

// Tests module
#[cfg(test)]
mod tests;

pub use health::health_check;
