// Storage models, one module per table group
pub mod user;
pub mod water_product;
pub mod water_log;
pub mod health_goal;
pub mod achievement;
pub mod notification;
pub mod reminder;
pub mod social;
pub mod report;
pub mod gdpr;
