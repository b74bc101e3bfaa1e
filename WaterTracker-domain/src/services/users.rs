use std::sync::Arc;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::user::{
    CreateUserRequest, LevelProgress, UpdateUserRequest, User, UserProfile, UserRole, UserStats,
    DEFAULT_DAILY_GOAL_ML,
};
use crate::services::errors::{validate_request, Actor, ServiceError};
use water_tracker_data::models::user::{User as DataUser, UserProgressUpdate};
use water_tracker_data::repository::{UserRepositoryTrait, WaterLogRepositoryTrait};

/// XP needed to go from `level` to `level + 1`
pub fn xp_to_next_level(level: i64) -> i64 {
    (100.0 * 1.15_f64.powi((level.max(1) - 1) as i32)).floor() as i64
}

/// Level reached with `xp` total experience. Level 1 starts at 0 XP.
pub fn level_for_xp(xp: i64) -> i64 {
    level_progress(xp).level
}

pub fn level_progress(xp: i64) -> LevelProgress {
    let mut level = 1;
    let mut remaining = xp.max(0);
    loop {
        let cost = xp_to_next_level(level);
        if remaining < cost {
            return LevelProgress {
                level,
                xp,
                xp_into_level: remaining,
                xp_for_next_level: cost,
            };
        }
        remaining -= cost;
        level += 1;
    }
}

/// Streak after logging on `today`
fn next_streak(last_log_date: Option<NaiveDate>, current_streak: i64, today: NaiveDate) -> i64 {
    match last_log_date {
        Some(last) if last == today => current_streak.max(1),
        Some(last) if last == today - Duration::days(1) => current_streak + 1,
        _ => 1,
    }
}

/// Trait for user account operations
#[async_trait]
pub trait UserServiceTrait {
    /// Register a new account
    async fn create_user(&self, request: CreateUserRequest) -> Result<User, ServiceError>;

    async fn get_user(&self, id: &str) -> Result<User, ServiceError>;

    async fn get_user_by_username(&self, username: &str) -> Result<User, ServiceError>;

    /// Admin only
    async fn list_users(&self, actor: &Actor, offset: usize, limit: usize) -> Result<(Vec<User>, usize), ServiceError>;

    /// Owner or admin
    async fn update_user(&self, actor: &Actor, id: &str, request: UpdateUserRequest) -> Result<User, ServiceError>;

    /// Admin only
    async fn set_role(&self, actor: &Actor, id: &str, role: UserRole) -> Result<User, ServiceError>;

    /// Ban or unban. Admin only.
    async fn set_active(&self, actor: &Actor, id: &str, active: bool) -> Result<User, ServiceError>;

    /// Soft delete. Owner or admin.
    async fn deactivate_user(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;

    async fn get_profile(&self, id: &str) -> Result<UserProfile, ServiceError>;

    /// Grant XP and points for activity on `date` and advance the streak
    async fn award_activity(&self, user_id: &str, xp: i64, points: i64, date: NaiveDate) -> Result<User, ServiceError>;
}

/// User service for domain logic
pub struct UserService<R: UserRepositoryTrait> {
    repository: R,
    logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
    clock: SharedClock,
}

impl<R: UserRepositoryTrait> UserService<R> {
    pub fn new(repository: R, logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>, clock: SharedClock) -> Self {
        Self { repository, logs, clock }
    }

    async fn load(&self, id: &str) -> Result<User, ServiceError> {
        let data_user = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        conversions::convert_to_domain_user(data_user).map_err(ServiceError::corrupt)
    }

    async fn store(&self, user: &User) -> Result<User, ServiceError> {
        let data_user = self.repository.update(&conversions::convert_to_data_user(user)).await?;
        conversions::convert_to_domain_user(data_user).map_err(ServiceError::corrupt)
    }
}

#[async_trait]
impl<R: UserRepositoryTrait + Send + Sync> UserServiceTrait for UserService<R> {
    async fn create_user(&self, request: CreateUserRequest) -> Result<User, ServiceError> {
        validate_request(&request)?;

        if self.repository.get_by_username(&request.username).await?.is_some() {
            warn!("Rejected duplicate username: {}", request.username);
            return Err(ServiceError::Conflict(format!("Username {} is already taken", request.username)));
        }

        let now = self.clock.now();
        let user = User {
            id: conversions::new_id(),
            username: request.username,
            email: request.email,
            role: UserRole::User,
            is_active: true,
            daily_goal_ml: request.daily_goal_ml.unwrap_or(DEFAULT_DAILY_GOAL_ML),
            current_streak: 0,
            longest_streak: 0,
            last_log_date: None,
            xp: 0,
            points: 0,
            level: 1,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.create(conversions::convert_to_data_user(&user))
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::Conflict(_) => ServiceError::Conflict("Username or email is already registered".to_string()),
                other => other,
            })?;

        info!("Created user {} ({})", stored.username, stored.id);
        conversions::convert_to_domain_user(stored).map_err(ServiceError::corrupt)
    }

    async fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        debug!("Getting user {}", id);
        self.load(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, ServiceError> {
        let data_user = self.repository.get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", username)))?;
        conversions::convert_to_domain_user(data_user).map_err(ServiceError::corrupt)
    }

    async fn list_users(&self, actor: &Actor, offset: usize, limit: usize) -> Result<(Vec<User>, usize), ServiceError> {
        actor.ensure_admin()?;
        let (data_users, total) = self.repository.list(offset, limit).await?;
        let users = data_users.into_iter()
            .map(conversions::convert_to_domain_user)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)?;
        Ok((users, total))
    }

    async fn update_user(&self, actor: &Actor, id: &str, request: UpdateUserRequest) -> Result<User, ServiceError> {
        actor.ensure_can_access(id)?;
        validate_request(&request)?;

        let mut user = self.load(id).await?;
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(goal) = request.daily_goal_ml {
            user.daily_goal_ml = goal;
        }
        if let Some(active) = request.is_active {
            user.is_active = active;
        }
        user.updated_at = self.clock.now();

        let updated = self.store(&user).await?;
        info!("Updated user {}", id);
        Ok(updated)
    }

    async fn set_role(&self, actor: &Actor, id: &str, role: UserRole) -> Result<User, ServiceError> {
        actor.ensure_admin()?;
        let mut user = self.load(id).await?;
        user.role = role;
        user.updated_at = self.clock.now();

        let updated = self.store(&user).await?;
        info!("User {} now has role {}", id, role);
        Ok(updated)
    }

    async fn set_active(&self, actor: &Actor, id: &str, active: bool) -> Result<User, ServiceError> {
        actor.ensure_admin()?;
        let mut user = self.load(id).await?;
        user.is_active = active;
        user.updated_at = self.clock.now();

        let updated = self.store(&user).await?;
        info!("User {} {}", id, if active { "unbanned" } else { "banned" });
        Ok(updated)
    }

    async fn deactivate_user(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        actor.ensure_can_access(id)?;
        if !self.repository.soft_delete(id, self.clock.now()).await? {
            return Err(ServiceError::not_found("User", id));
        }
        info!("Deactivated user {}", id);
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<UserProfile, ServiceError> {
        let user = self.load(id).await?;
        let (total_logs, total_volume_ml) = self.logs.totals(id).await?;

        Ok(UserProfile {
            level_progress: level_progress(user.xp),
            stats: UserStats { total_logs, total_volume_ml },
            user,
        })
    }

    async fn award_activity(&self, user_id: &str, xp: i64, points: i64, date: NaiveDate) -> Result<User, ServiceError> {
        let change = move |current: &DataUser| {
            let total_xp = current.xp + xp;
            let current_streak = next_streak(current.last_log_date, current.current_streak, date);
            UserProgressUpdate {
                xp: total_xp,
                points: current.points + points,
                level: level_for_xp(total_xp),
                current_streak,
                longest_streak: current.longest_streak.max(current_streak),
                last_log_date: Some(match current.last_log_date {
                    Some(last) if last > date => last,
                    _ => date,
                }),
            }
        };

        let updated = self.repository.apply_progress(user_id, &change)
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::NotFound(_) => ServiceError::not_found("User", user_id),
                other => other,
            })?;

        debug!("Awarded {} XP and {} points to {}", xp, points, user_id);
        conversions::convert_to_domain_user(updated).map_err(ServiceError::corrupt)
    }
}
