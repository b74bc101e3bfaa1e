use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::validation::validate_username;

string_enum!(
    /// Account role
    UserRole {
        User => "user",
        Admin => "admin",
    }
);

/// Default daily hydration target in millilitres
pub const DEFAULT_DAILY_GOAL_ML: i64 = 2000;

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    /// False once the account is deactivated or banned
    pub is_active: bool,
    /// Daily hydration target in millilitres
    pub daily_goal_ml: i64,
    /// Consecutive days with at least one water log
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_log_date: Option<NaiveDate>,
    pub xp: i64,
    pub points: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user holds the admin role
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Request payload for creating an account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateUserRequest {
    /// 3 to 50 letters, digits or underscores
    #[validate(
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"),
        custom = "validate_username"
    )]
    pub username: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    /// Defaults to 2000 ml
    #[validate(range(min = 250, max = 10000, message = "Daily goal must be between 250 and 10000 ml"))]
    pub daily_goal_ml: Option<i64>,
}

/// Request payload for updating an account
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateUserRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,

    #[validate(range(min = 250, max = 10000, message = "Daily goal must be between 250 and 10000 ml"))]
    pub daily_goal_ml: Option<i64>,

    pub is_active: Option<bool>,
}

/// Request payload for changing a user's role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SetRoleRequest {
    pub role: UserRole,
}

/// Where a user stands on the XP curve
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LevelProgress {
    pub level: i64,
    /// Total XP earned
    pub xp: i64,
    /// XP earned since reaching the current level
    pub xp_into_level: i64,
    /// XP the current level costs to complete
    pub xp_for_next_level: i64,
}

/// Lifetime logging totals
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserStats {
    pub total_logs: i64,
    pub total_volume_ml: i64,
}

/// A user with level progress and logging totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserProfile {
    pub user: User,
    pub level_progress: LevelProgress,
    pub stats: UserStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: "sam@example.com".to_string(),
            daily_goal_ml: None,
        }
    }

    #[test]
    fn test_create_user_request_validation() {
        assert!(request("sam_water").validate().is_ok());
        assert!(request("ab").validate().is_err());
        assert!(request("has space").validate().is_err());

        let bad_email = CreateUserRequest { email: "not-an-email".to_string(), ..request("sam") };
        assert!(bad_email.validate().is_err());

        let low_goal = CreateUserRequest { daily_goal_ml: Some(100), ..request("sam") };
        assert!(low_goal.validate().is_err());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!("user".parse::<UserRole>(), Ok(UserRole::User));
        assert!("root".parse::<UserRole>().is_err());
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
    }
}
