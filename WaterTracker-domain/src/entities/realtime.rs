use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::social::LeaderboardEntry;

/// Events the domain pushes to connected clients.
///
/// Serialized as `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RealtimeEvent {
    SystemMessage {
        message: String,
    },
    NewNotification {
        id: String,
        title: String,
        message: String,
        read: bool,
    },
    AchievementUnlocked {
        achievement_id: String,
        name: String,
        stage: i64,
    },
    LeaderboardUpdate {
        leaderboard_id: String,
        entries: Vec<LeaderboardEntry>,
    },
    ChatMessage {
        room_id: String,
        sender_id: String,
        sender_username: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
}

/// Channel of a user's private notification stream
pub fn notification_channel(user_id: &str) -> String {
    format!("user:{}:notifications", user_id)
}

/// Channel of a leaderboard
pub fn leaderboard_channel(leaderboard_id: &str) -> String {
    format!("leaderboard:{}", leaderboard_id)
}

/// Channel of a chat room
pub fn chat_channel(room_id: &str) -> String {
    format!("chat:{}", room_id)
}

/// Leaderboard that ranks every active user
pub const GLOBAL_LEADERBOARD: &str = "global";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_envelope() {
        let event = RealtimeEvent::AchievementUnlocked {
            achievement_id: "first_sip".to_string(),
            name: "First Sip".to_string(),
            stage: 1,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "achievement_unlocked", "payload": {"achievement_id": "first_sip", "name": "First Sip", "stage": 1}})
        );
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(notification_channel("42"), "user:42:notifications");
        assert_eq!(leaderboard_channel(GLOBAL_LEADERBOARD), "leaderboard:global");
        assert_eq!(chat_channel("lobby"), "chat:lobby");
    }
}
