use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

string_enum!(
    FriendshipStatus {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
        Blocked => "blocked",
    }
);

string_enum!(
    /// Answer of the addressee to a friend request
    FriendAction {
        Accept => "accept",
        Decline => "decline",
        Block => "block",
    }
);

impl FriendAction {
    pub fn resulting_status(&self) -> FriendshipStatus {
        match self {
            FriendAction::Accept => FriendshipStatus::Accepted,
            FriendAction::Decline => FriendshipStatus::Declined,
            FriendAction::Block => FriendshipStatus::Blocked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Friendship {
    pub id: String,
    pub requester_id: String,
    pub addressee_id: String,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    /// The user on the other side of the friendship
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.requester_id == user_id {
            &self.addressee_id
        } else {
            &self.requester_id
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct FriendRequest {
    pub addressee_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RespondFriendRequest {
    pub action: FriendAction,
}

/// An accepted friend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Friend {
    pub friendship_id: String,
    pub user_id: String,
    pub username: String,
    pub level: i64,
    pub points: i64,
    pub since: DateTime<Utc>,
}

/// An entry in the activity feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub points: i64,
    pub xp: i64,
    pub level: i64,
    pub current_streak: i64,
}
