use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::social::{Activity, Friend, FriendAction, Friendship, FriendshipStatus, LeaderboardEntry};
use crate::fixtures::vars;
use crate::services::errors::ServiceError;
use crate::services::notifications::NotificationServiceTrait;
use water_tracker_data::repository::{SocialRepositoryTrait, UserRepositoryTrait};

/// Trait for friendships, the activity feed and the leaderboard
#[async_trait]
pub trait SocialServiceTrait {
    async fn send_friend_request(&self, requester_id: &str, addressee_id: &str) -> Result<Friendship, ServiceError>;

    /// Only the addressee of a pending request may answer it
    async fn respond_to_request(
        &self,
        user_id: &str,
        friendship_id: &str,
        action: FriendAction,
    ) -> Result<Friendship, ServiceError>;

    async fn list_friends(&self, user_id: &str) -> Result<Vec<Friend>, ServiceError>;

    /// Requests waiting for the user's answer
    async fn list_pending(&self, user_id: &str) -> Result<Vec<Friendship>, ServiceError>;

    async fn record_activity(&self, user_id: &str, activity_type: &str, data: Value) -> Result<Activity, ServiceError>;

    /// Own and accepted friends' activities, newest first
    async fn activity_feed(&self, user_id: &str, limit: usize) -> Result<Vec<Activity>, ServiceError>;

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ServiceError>;
}

/// Social service for domain logic
pub struct SocialService<R: SocialRepositoryTrait> {
    repository: R,
    users: Arc<dyn UserRepositoryTrait + Send + Sync>,
    notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
    clock: SharedClock,
}

impl<R: SocialRepositoryTrait> SocialService<R> {
    pub fn new(
        repository: R,
        users: Arc<dyn UserRepositoryTrait + Send + Sync>,
        notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
        clock: SharedClock,
    ) -> Self {
        Self { repository, users, notifications, clock }
    }

    async fn friendships(&self, user_id: &str, status: FriendshipStatus) -> Result<Vec<Friendship>, ServiceError> {
        self.repository.list_for_user(user_id, Some(status.as_str()))
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_friendship)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }
}

#[async_trait]
impl<R: SocialRepositoryTrait + Send + Sync> SocialServiceTrait for SocialService<R> {
    async fn send_friend_request(&self, requester_id: &str, addressee_id: &str) -> Result<Friendship, ServiceError> {
        if requester_id == addressee_id {
            return Err(ServiceError::ValidationError("You cannot send a friend request to yourself".to_string()));
        }

        let requester = self.users.get_by_id(requester_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", requester_id))?;
        if self.users.get_by_id(addressee_id).await?.is_none() {
            return Err(ServiceError::not_found("User", addressee_id));
        }
        if self.repository.find_between(requester_id, addressee_id).await?.is_some() {
            warn!("Duplicate friend request between {} and {}", requester_id, addressee_id);
            return Err(ServiceError::Conflict("A friendship between these users already exists".to_string()));
        }

        let now = self.clock.now();
        let friendship = Friendship {
            id: conversions::new_id(),
            requester_id: requester_id.to_string(),
            addressee_id: addressee_id.to_string(),
            status: FriendshipStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let stored = self.repository
            .create_friendship(conversions::convert_to_data_friendship(&friendship))
            .await?;
        let friendship = conversions::convert_to_domain_friendship(stored).map_err(ServiceError::corrupt)?;

        let notification = self.notifications
            .render_template("friend_request", addressee_id, &vars([("username", requester.username)]))?
            .with_related("friendship", &friendship.id);
        self.notifications.create_notification(notification).await?;

        info!("Friend request {} from {} to {}", friendship.id, requester_id, addressee_id);
        Ok(friendship)
    }

    async fn respond_to_request(
        &self,
        user_id: &str,
        friendship_id: &str,
        action: FriendAction,
    ) -> Result<Friendship, ServiceError> {
        let stored = self.repository.get_friendship(friendship_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Friend request", friendship_id))?;
        let mut friendship = conversions::convert_to_domain_friendship(stored).map_err(ServiceError::corrupt)?;

        if friendship.addressee_id != user_id {
            return Err(ServiceError::Forbidden("Only the addressee can respond to a friend request".to_string()));
        }
        if friendship.status != FriendshipStatus::Pending {
            return Err(ServiceError::Conflict(format!("Friend request is already {}", friendship.status)));
        }

        let now = self.clock.now();
        friendship.status = action.resulting_status();
        friendship.updated_at = now;
        self.repository.update_status(friendship_id, friendship.status.as_str(), now).await?;

        info!("Friend request {} is now {}", friendship_id, friendship.status);
        Ok(friendship)
    }

    async fn list_friends(&self, user_id: &str) -> Result<Vec<Friend>, ServiceError> {
        let mut friends = Vec::new();
        for friendship in self.friendships(user_id, FriendshipStatus::Accepted).await? {
            let other_id = friendship.other_party(user_id);
            let Some(other) = self.users.get_by_id(other_id).await? else {
                continue;
            };
            friends.push(Friend {
                friendship_id: friendship.id.clone(),
                user_id: other.id,
                username: other.username,
                level: other.level,
                points: other.points,
                since: friendship.updated_at,
            });
        }
        Ok(friends)
    }

    async fn list_pending(&self, user_id: &str) -> Result<Vec<Friendship>, ServiceError> {
        Ok(self.friendships(user_id, FriendshipStatus::Pending)
            .await?
            .into_iter()
            .filter(|f| f.addressee_id == user_id)
            .collect())
    }

    async fn record_activity(&self, user_id: &str, activity_type: &str, data: Value) -> Result<Activity, ServiceError> {
        let activity = Activity {
            id: conversions::new_id(),
            user_id: user_id.to_string(),
            activity_type: activity_type.to_string(),
            data,
            created_at: self.clock.now(),
        };
        let stored = self.repository.record_activity(conversions::convert_to_data_activity(&activity)).await?;
        debug!("Recorded {} activity for {}", activity_type, user_id);
        Ok(conversions::convert_to_domain_activity(stored))
    }

    async fn activity_feed(&self, user_id: &str, limit: usize) -> Result<Vec<Activity>, ServiceError> {
        let mut user_ids = vec![user_id.to_string()];
        for friendship in self.friendships(user_id, FriendshipStatus::Accepted).await? {
            user_ids.push(friendship.other_party(user_id).to_string());
        }

        Ok(self.repository.feed(&user_ids, limit)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_activity)
            .collect())
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        let rows = self.users.leaderboard(limit).await?;
        Ok(conversions::convert_to_domain_leaderboard(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use crate::entities::notification::NotificationType;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn test_friend_request_flow() {
        let ctx = TestContext::new();
        let ana = ctx.create_user("ana").await;
        let ben = ctx.create_user("ben").await;

        let request = ctx.services.social.send_friend_request(&ana.id, &ben.id).await.unwrap();
        assert_eq!(request.status, FriendshipStatus::Pending);

        let inbox = ctx.services.notifications.list_notifications(&ben.id, None, 0, 10).await.unwrap();
        assert_eq!(inbox.notifications[0].notification_type, NotificationType::FriendRequest);
        assert_eq!(inbox.notifications[0].related_entity_id.as_deref(), Some(request.id.as_str()));

        let pending = ctx.services.social.list_pending(&ben.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(ctx.services.social.list_pending(&ana.id).await.unwrap().is_empty());

        let err = ctx.services.social.respond_to_request(&ana.id, &request.id, FriendAction::Accept).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let accepted = ctx.services.social.respond_to_request(&ben.id, &request.id, FriendAction::Accept).await.unwrap();
        assert_eq!(accepted.status, FriendshipStatus::Accepted);

        let friends = ctx.services.social.list_friends(&ana.id).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username, "ben");

        let again = ctx.services.social.respond_to_request(&ben.id, &request.id, FriendAction::Block).await.unwrap_err();
        assert!(matches!(again, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_friend_request_rules() {
        let ctx = TestContext::new();
        let ana = ctx.create_user("ana").await;
        let ben = ctx.create_user("ben").await;

        assert!(matches!(
            ctx.services.social.send_friend_request(&ana.id, &ana.id).await.unwrap_err(),
            ServiceError::ValidationError(_)
        ));
        ctx.services.social.send_friend_request(&ana.id, &ben.id).await.unwrap();
        assert!(matches!(
            ctx.services.social.send_friend_request(&ben.id, &ana.id).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ctx.services.social.send_friend_request(&ana.id, "missing").await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_feed_includes_accepted_friends_only() {
        let ctx = TestContext::new();
        let ana = ctx.create_user("ana").await;
        let ben = ctx.create_user("ben").await;
        let cy = ctx.create_user("cy").await;

        let request = ctx.services.social.send_friend_request(&ana.id, &ben.id).await.unwrap();
        ctx.services.social.respond_to_request(&ben.id, &request.id, FriendAction::Accept).await.unwrap();

        ctx.services.social.record_activity(&ana.id, "joined", json!({})).await.unwrap();
        ctx.clock.advance(Duration::minutes(1));
        ctx.services.social.record_activity(&ben.id, "logged_water", json!({"volume_ml": 300})).await.unwrap();
        ctx.services.social.record_activity(&cy.id, "logged_water", json!({})).await.unwrap();

        let feed = ctx.services.social.activity_feed(&ana.id, 10).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].user_id, ben.id);
        assert_eq!(feed[1].user_id, ana.id);
    }
}
