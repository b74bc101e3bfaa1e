use std::sync::Arc;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use tracing::{info, warn};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::gdpr::{CreateGdprRequest, GdprRequest, GdprRequestStatus, GdprRequestType, UpdateGdprStatusRequest};
use crate::entities::report::{GenerateReportRequest, ReportType};
use crate::fixtures::Fixtures;
use crate::services::errors::{validate_request, Actor, ServiceError};
use crate::services::reports::ReportServiceTrait;
use water_tracker_data::repository::{
    GdprRepositoryTrait, HealthGoalRepositoryTrait, NotificationRepositoryTrait, UserRepositoryTrait,
    WaterLogRepositoryTrait,
};

/// Trait for data subject requests
#[async_trait]
pub trait GdprServiceTrait {
    /// File a request. Access, portability and erasure are fulfilled at once.
    async fn create_request(&self, user_id: &str, request: CreateGdprRequest) -> Result<GdprRequest, ServiceError>;

    async fn get_request(&self, actor: &Actor, id: &str) -> Result<GdprRequest, ServiceError>;

    async fn list_requests(&self, user_id: &str) -> Result<Vec<GdprRequest>, ServiceError>;

    /// Every request, optionally by status. Admins only.
    async fn list_all_requests(
        &self,
        actor: &Actor,
        status: Option<GdprRequestStatus>,
    ) -> Result<Vec<GdprRequest>, ServiceError>;

    /// Move a request to a new status and append a note. Admins only.
    async fn update_status(
        &self,
        actor: &Actor,
        id: &str,
        request: UpdateGdprStatusRequest,
    ) -> Result<GdprRequest, ServiceError>;
}

/// GDPR service for domain logic
pub struct GdprService<R: GdprRepositoryTrait> {
    repository: R,
    users: Arc<dyn UserRepositoryTrait + Send + Sync>,
    logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
    goals: Arc<dyn HealthGoalRepositoryTrait + Send + Sync>,
    notifications: Arc<dyn NotificationRepositoryTrait + Send + Sync>,
    reports: Arc<dyn ReportServiceTrait + Send + Sync>,
    fixtures: Arc<Fixtures>,
    clock: SharedClock,
}

impl<R: GdprRepositoryTrait> GdprService<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: R,
        users: Arc<dyn UserRepositoryTrait + Send + Sync>,
        logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
        goals: Arc<dyn HealthGoalRepositoryTrait + Send + Sync>,
        notifications: Arc<dyn NotificationRepositoryTrait + Send + Sync>,
        reports: Arc<dyn ReportServiceTrait + Send + Sync>,
        fixtures: Arc<Fixtures>,
        clock: SharedClock,
    ) -> Self {
        Self { repository, users, logs, goals, notifications, reports, fixtures, clock }
    }

    async fn load(&self, id: &str) -> Result<GdprRequest, ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("GDPR request", id))?;
        conversions::convert_to_domain_gdpr_request(stored).map_err(ServiceError::corrupt)
    }

    async fn store(&self, request: &GdprRequest) -> Result<GdprRequest, ServiceError> {
        let stored = self.repository.update(&conversions::convert_to_data_gdpr_request(request)).await?;
        conversions::convert_to_domain_gdpr_request(stored).map_err(ServiceError::corrupt)
    }

    /// Generate a personal data export covering the whole account lifetime
    async fn export(&self, request: &mut GdprRequest) -> Result<(), ServiceError> {
        let stored = self.users.get_by_id(&request.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.user_id))?;
        let today = self.clock.now().date_naive();

        let report = self.reports
            .generate_report(
                &request.user_id,
                GenerateReportRequest {
                    report_type: ReportType::GdprExport,
                    period_start: stored.created_at.date_naive().min(today),
                    period_end: today,
                },
            )
            .await?;

        request.response_data = Some(json!({"report_id": report.id}));
        request.notes.push(format!("Personal data export generated as report {}", report.id));
        Ok(())
    }

    /// Deactivate the account and remove the user's personal records
    async fn erase(&self, request: &mut GdprRequest) -> Result<(), ServiceError> {
        let now = self.clock.now();
        let user = self.users.get_by_id(&request.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.user_id))?;

        let logs_deleted = self.logs.soft_delete_for_user(&user.id, now).await?;
        let goals_deleted = self.goals.soft_delete_for_user(&user.id, now).await?;
        let notifications_deleted = self.notifications.delete_for_user(&user.id).await?;
        if !self.users.soft_delete(&user.id, now).await? {
            return Err(ServiceError::not_found("User", &user.id));
        }

        warn!("Erased personal data of user {}", user.id);
        request.response_data = Some(json!({
            "water_logs_deleted": logs_deleted,
            "health_goals_deleted": goals_deleted,
            "notifications_deleted": notifications_deleted,
            "account_deactivated": true,
        }));
        request.notes.push("Account deactivated and personal data erased".to_string());
        Ok(())
    }
}

#[async_trait]
impl<R: GdprRepositoryTrait + Send + Sync> GdprServiceTrait for GdprService<R> {
    async fn create_request(&self, user_id: &str, request: CreateGdprRequest) -> Result<GdprRequest, ServiceError> {
        validate_request(&request)?;

        let open = self.list_requests(user_id).await?.into_iter().any(|r| {
            r.request_type == request.request_type
                && matches!(r.status, GdprRequestStatus::Pending | GdprRequestStatus::Processing)
        });
        if open {
            return Err(ServiceError::Conflict(format!(
                "An open {} request already exists",
                request.request_type
            )));
        }

        let now = self.clock.now();
        let deadline_days = self.fixtures.gdpr_deadline_days(request.request_type);
        let mut notes = Vec::new();
        if let Some(policy) = self.fixtures.gdpr_policy(request.request_type) {
            notes.push(format!("Submitted under {} GDPR: {}", policy.article, policy.description));
        }

        let gdpr_request = GdprRequest {
            id: conversions::new_id(),
            user_id: user_id.to_string(),
            request_type: request.request_type,
            data_categories: request.data_categories,
            reason: request.reason,
            status: GdprRequestStatus::Pending,
            deadline: now + Duration::days(deadline_days),
            submitted_at: now,
            processed_at: None,
            completed_at: None,
            response_data: None,
            notes,
        };
        let stored = self.repository.create(conversions::convert_to_data_gdpr_request(&gdpr_request)).await?;
        let mut gdpr_request = conversions::convert_to_domain_gdpr_request(stored).map_err(ServiceError::corrupt)?;
        info!("User {} filed {} request {}", user_id, gdpr_request.request_type, gdpr_request.id);

        let outcome = match gdpr_request.request_type {
            GdprRequestType::Access | GdprRequestType::Portability => self.export(&mut gdpr_request).await,
            GdprRequestType::Erasure => self.erase(&mut gdpr_request).await,
            _ => return Ok(gdpr_request),
        };
        if let Err(e) = outcome {
            // A failed request is closed so that it does not block a new one
            warn!("Could not process {} request {}: {}", gdpr_request.request_type, gdpr_request.id, e);
            gdpr_request.status = GdprRequestStatus::Rejected;
            gdpr_request.processed_at = Some(now);
            gdpr_request.completed_at = Some(now);
            gdpr_request.notes.push(format!("Processing failed: {}", e));
            self.store(&gdpr_request).await?;
            return Err(e);
        }

        gdpr_request.status = GdprRequestStatus::Completed;
        gdpr_request.processed_at = Some(now);
        gdpr_request.completed_at = Some(now);
        let gdpr_request = self.store(&gdpr_request).await?;
        info!("Completed {} request {}", gdpr_request.request_type, gdpr_request.id);
        Ok(gdpr_request)
    }

    async fn get_request(&self, actor: &Actor, id: &str) -> Result<GdprRequest, ServiceError> {
        let request = self.load(id).await?;
        actor.ensure_can_access(&request.user_id)?;
        Ok(request)
    }

    async fn list_requests(&self, user_id: &str) -> Result<Vec<GdprRequest>, ServiceError> {
        self.repository.list_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_gdpr_request)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }

    async fn list_all_requests(
        &self,
        actor: &Actor,
        status: Option<GdprRequestStatus>,
    ) -> Result<Vec<GdprRequest>, ServiceError> {
        actor.ensure_admin()?;
        self.repository.list_all(status.map(|s| s.as_str()))
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_gdpr_request)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }

    async fn update_status(
        &self,
        actor: &Actor,
        id: &str,
        update: UpdateGdprStatusRequest,
    ) -> Result<GdprRequest, ServiceError> {
        actor.ensure_admin()?;
        validate_request(&update)?;
        let mut request = self.load(id).await?;
        let now = self.clock.now();

        match update.status {
            GdprRequestStatus::Processing => {
                request.processed_at = request.processed_at.or(Some(now));
            },
            GdprRequestStatus::Completed | GdprRequestStatus::Rejected => {
                request.processed_at = request.processed_at.or(Some(now));
                request.completed_at = Some(now);
            },
            GdprRequestStatus::Pending => {},
        }
        request.status = update.status;
        request.notes.push(match update.note {
            Some(note) => format!("{}: {}", update.status, note),
            None => format!("Status changed to {}", update.status),
        });

        let request = self.store(&request).await?;
        info!("Admin {} moved GDPR request {} to {}", actor.user_id, id, request.status);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::water_log::CreateWaterLogRequest;
    use crate::clock::Clock;
    use crate::services::reports::MockReportServiceTrait;
    use crate::testing::TestContext;
    use water_tracker_data::repository::{
        GdprRepository, HealthGoalRepository, NotificationRepository, UserRepository, WaterLogRepository,
    };

    fn service_with_reports(ctx: &TestContext, reports: MockReportServiceTrait) -> GdprService<GdprRepository> {
        GdprService::new(
            GdprRepository::with_pool(ctx.pool.clone()),
            Arc::new(UserRepository::with_pool(ctx.pool.clone())),
            Arc::new(WaterLogRepository::with_pool(ctx.pool.clone())),
            Arc::new(HealthGoalRepository::with_pool(ctx.pool.clone())),
            Arc::new(NotificationRepository::with_pool(ctx.pool.clone())),
            Arc::new(reports),
            Arc::new(Fixtures::embedded().unwrap()),
            ctx.clock.clone(),
        )
    }

    fn request(request_type: GdprRequestType) -> CreateGdprRequest {
        CreateGdprRequest { request_type, data_categories: vec!["water_logs".to_string()], reason: None }
    }

    #[tokio::test]
    async fn test_access_request_produces_export() {
        let ctx = TestContext::new();
        let user = ctx.create_user("curious").await;
        let log = CreateWaterLogRequest { water_id: None, volume_ml: 330, drink_type: None, caffeine_mg: None, logged_at: None };
        ctx.services.water_logs.log_water(&user.id, log).await.unwrap();

        let filed = ctx.services.gdpr.create_request(&user.id, request(GdprRequestType::Access)).await.unwrap();
        assert_eq!(filed.status, GdprRequestStatus::Completed);
        assert_eq!(filed.deadline, ctx.clock.now() + Duration::days(30));
        assert!(filed.notes[0].contains("Article 15"));

        let report_id = filed.response_data.as_ref().unwrap()["report_id"].as_str().unwrap().to_string();
        let report = ctx.services.reports.get_report(&Actor::user(&user.id), &report_id).await.unwrap();
        assert_eq!(report.report_type, ReportType::GdprExport);
        assert_eq!(report.title, "Personal Data Export");
        assert_eq!(report.content["raw_data"]["water_logs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_erasure_removes_personal_data() {
        let ctx = TestContext::new();
        let user = ctx.create_user("leaving").await;
        let log = CreateWaterLogRequest { water_id: None, volume_ml: 500, drink_type: None, caffeine_mg: None, logged_at: None };
        ctx.services.water_logs.log_water(&user.id, log).await.unwrap();
        assert!(ctx.services.notifications.unread_count(&user.id).await.unwrap() > 0);

        let filed = ctx.services.gdpr.create_request(&user.id, request(GdprRequestType::Erasure)).await.unwrap();
        assert_eq!(filed.status, GdprRequestStatus::Completed);
        assert_eq!(filed.response_data.as_ref().unwrap()["water_logs_deleted"], 1);

        assert!(matches!(
            ctx.services.users.get_user(&user.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        let stored = UserRepository::with_pool(ctx.pool.clone()).get_by_id(&user.id).await.unwrap();
        assert!(stored.is_none());
        let page = ctx.services.water_logs.search_logs(&user.id, &Default::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(ctx.services.notifications.unread_count(&user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_other_requests_wait_for_an_admin() {
        let ctx = TestContext::new();
        let user = ctx.create_user("objector").await;

        let filed = ctx.services.gdpr.create_request(&user.id, request(GdprRequestType::Objection)).await.unwrap();
        assert_eq!(filed.status, GdprRequestStatus::Pending);
        assert!(matches!(
            ctx.services.gdpr.create_request(&user.id, request(GdprRequestType::Objection)).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));

        let member = Actor::user(&user.id);
        let update = UpdateGdprStatusRequest { status: GdprRequestStatus::Completed, note: Some("Processing stopped".to_string()) };
        assert!(matches!(
            ctx.services.gdpr.update_status(&member, &filed.id, update.clone()).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let admin = Actor::admin("admin-1");
        let pending = ctx.services.gdpr.list_all_requests(&admin, Some(GdprRequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);

        let done = ctx.services.gdpr.update_status(&admin, &filed.id, update).await.unwrap();
        assert_eq!(done.status, GdprRequestStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.notes.last().map(String::as_str), Some("completed: Processing stopped"));

        assert_eq!(ctx.services.gdpr.get_request(&member, &filed.id).await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_failed_export_can_be_filed_again() {
        let ctx = TestContext::new();
        let user = ctx.create_user("persistent").await;

        let mut reports = MockReportServiceTrait::new();
        reports
            .expect_generate_report()
            .times(1)
            .returning(|_, _| Err(ServiceError::RepositoryError("report storage unavailable".to_string())));
        let failing = service_with_reports(&ctx, reports);

        let err = failing.create_request(&user.id, request(GdprRequestType::Access)).await.unwrap_err();
        assert!(matches!(err, ServiceError::RepositoryError(_)));

        let filed = failing.list_requests(&user.id).await.unwrap();
        assert_eq!(filed.len(), 1);
        assert_eq!(filed[0].status, GdprRequestStatus::Rejected);
        assert!(filed[0].notes.last().unwrap().starts_with("Processing failed"));

        let retried = ctx.services.gdpr.create_request(&user.id, request(GdprRequestType::Access)).await.unwrap();
        assert_eq!(retried.status, GdprRequestStatus::Completed);
    }
}
