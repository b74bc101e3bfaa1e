use std::sync::Arc;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::clock::{start_of_day, SharedClock};
use crate::entities::admin::{AnnouncementRequest, SiteStats};
use crate::entities::conversions;
use crate::fixtures::vars;
use crate::services::errors::{validate_request, Actor, ServiceError};
use crate::services::notifications::NotificationServiceTrait;
use water_tracker_data::repository::UserRepositoryTrait;

/// Trait for site administration
#[async_trait]
pub trait AdminServiceTrait {
    async fn site_stats(&self, actor: &Actor) -> Result<SiteStats, ServiceError>;

    /// Notify every listed user; unknown ids are skipped. Returns how many were notified.
    async fn send_announcement(&self, actor: &Actor, request: AnnouncementRequest) -> Result<usize, ServiceError>;
}

/// Admin service for domain logic
pub struct AdminService<R: UserRepositoryTrait> {
    users: R,
    notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
    clock: SharedClock,
}

impl<R: UserRepositoryTrait> AdminService<R> {
    pub fn new(users: R, notifications: Arc<dyn NotificationServiceTrait + Send + Sync>, clock: SharedClock) -> Self {
        Self { users, notifications, clock }
    }
}

#[async_trait]
impl<R: UserRepositoryTrait + Send + Sync> AdminServiceTrait for AdminService<R> {
    async fn site_stats(&self, actor: &Actor) -> Result<SiteStats, ServiceError> {
        actor.ensure_admin()?;
        let today = self.clock.now().date_naive();
        let stats = self.users.site_stats(start_of_day(today)).await?;
        Ok(conversions::convert_to_domain_site_stats(stats))
    }

    async fn send_announcement(&self, actor: &Actor, request: AnnouncementRequest) -> Result<usize, ServiceError> {
        actor.ensure_admin()?;
        validate_request(&request)?;

        let template_vars = vars([("title", request.title.clone()), ("message", request.message.clone())]);
        let mut sent = 0;
        for user_id in &request.user_ids {
            if self.users.get_by_id(user_id).await?.is_none() {
                warn!("Skipping announcement for unknown user {}", user_id);
                continue;
            }
            let mut notification = self.notifications.render_template("system_announcement", user_id, &template_vars)?;
            if let Some(priority) = request.priority {
                notification = notification.with_priority(priority);
            }
            self.notifications.create_notification(notification).await?;
            sent += 1;
        }

        info!("Admin {} sent announcement '{}' to {} users", actor.user_id, request.title, sent);
        Ok(sent)
    }
}
