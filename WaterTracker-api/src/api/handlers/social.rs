use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::social::{
    Activity, Friend, FriendRequest, Friendship, LeaderboardEntry, RespondFriendRequest,
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::LimitParams;

const DEFAULT_FEED_LIMIT: usize = 20;
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[utoipa::path(
    post,
    path = "/api/v1/social/friends/requests",
    request_body = FriendRequest,
    responses(
        (status = 201, description = "Request sent", body = Friendship),
        (status = 400, description = "Request to self", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 409, description = "Pair already linked", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "social"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn send_friend_request(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<FriendRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let friendship = state
        .services
        .social
        .send_friend_request(&user.user_id, &request.addressee_id)
        .await?;
    info!("Friend request {} sent", friendship.id);
    Ok((StatusCode::CREATED, Json(friendship)))
}

#[utoipa::path(
    get,
    path = "/api/v1/social/friends/requests",
    responses((status = 200, description = "Requests awaiting the caller's answer", body = [Friendship])),
    security(("bearer" = [])),
    tag = "social"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.social.list_pending(&user.user_id).await?))
}

/// Accept, decline or block a pending request
#[utoipa::path(
    post,
    path = "/api/v1/social/friends/requests/{id}/respond",
    params(("id" = String, Path, description = "Friendship ID")),
    request_body = RespondFriendRequest,
    responses(
        (status = 200, description = "Request answered", body = Friendship),
        (status = 400, description = "Request is not pending", body = ErrorResponse),
        (status = 403, description = "Not the addressee", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "social"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn respond_to_request(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<RespondFriendRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let friendship = state
        .services
        .social
        .respond_to_request(&user.user_id, &id, request.action)
        .await?;
    Ok(Json(friendship))
}

#[utoipa::path(
    get,
    path = "/api/v1/social/friends",
    responses((status = 200, description = "Accepted friends", body = [Friend])),
    security(("bearer" = [])),
    tag = "social"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.social.list_friends(&user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/social/feed",
    params(LimitParams),
    responses((status = 200, description = "Own and friends' activity, newest first", body = [Activity])),
    security(("bearer" = [])),
    tag = "social"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn activity_feed(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let feed = state
        .services
        .social
        .activity_feed(&user.user_id, params.limit_or(DEFAULT_FEED_LIMIT))
        .await?;
    Ok(Json(feed))
}

#[utoipa::path(
    get,
    path = "/api/v1/social/leaderboard",
    params(LimitParams),
    responses((status = 200, description = "Active users by points, then XP", body = [LeaderboardEntry])),
    security(("bearer" = [])),
    tag = "social"
)]
#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.social.leaderboard(params.limit_or(DEFAULT_LEADERBOARD_LIMIT)).await?))
}
