use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use water_tracker_domain::auth::TokenPair;
use water_tracker_domain::entities::user::User;

/// A new account and its first tokens
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub user: User,
    pub tokens: TokenPair,
}

/// Refresh request payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Refresh token issued with the last token pair
    pub refresh_token: String,
}

/// Who the caller is, according to their token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthInfoResponse {
    pub user_id: String,
    pub roles: Vec<String>,
    /// "jwt" or "bypass"
    pub auth_source: String,
    /// Access token expiry as a Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}
