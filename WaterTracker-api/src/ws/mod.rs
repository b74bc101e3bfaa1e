//! Real-time channel at `GET /ws`

pub mod handler;
pub mod heartbeat;
pub mod manager;
pub mod messages;

pub use handler::ws_handler;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::ConnectionManager;
