// Domain entities and value objects

/// Declares a string-backed enum with serde names, `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire and storage name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("Unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

pub mod user;
pub mod water;
pub mod water_log;
pub mod goal;
pub mod achievement;
pub mod notification;
pub mod reminder;
pub mod social;
pub mod report;
pub mod gdpr;
pub mod admin;
pub mod realtime;
pub mod validation;
pub mod conversions;

// Re-export common types for easier imports
pub use user::{CreateUserRequest, UpdateUserRequest, User, UserProfile, UserRole};
pub use water::{HealthStatus, Ingredient, WaterProduct, WaterProductDetails, WaterSearchCriteria, WaterSummary};
pub use water_log::{CreateWaterLogRequest, DailySummary, HydrationAnalytics, LogSearchCriteria, WaterLog};
pub use goal::{GoalStatus, GoalType, HealthGoal, Milestone};
pub use notification::{Notification, NotificationPriority, NotificationSettings, NotificationStatus, NotificationType};
pub use realtime::RealtimeEvent;
