use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

/// Directed friendship between two users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Friendship {
    pub id: String,
    pub requester_id: String,
    pub addressee_id: String,
    /// pending, accepted, declined or blocked
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry in a user's activity feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Row of the points leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub username: String,
    pub points: i64,
    pub xp: i64,
    pub level: i64,
    pub current_streak: i64,
}
