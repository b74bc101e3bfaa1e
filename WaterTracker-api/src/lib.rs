// WaterTracker-api lib.rs
//
// HTTP and WebSocket surface of the WaterTracker backend.

pub mod api;
pub mod entities;
pub mod openapi;
pub mod tasks;
pub mod ws;

pub use api::{create_app, create_router, AppState};
