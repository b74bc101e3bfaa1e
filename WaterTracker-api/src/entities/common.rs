use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use water_tracker_domain::entities::gdpr::GdprRequestStatus;
use water_tracker_domain::entities::goal::GoalStatus;
use water_tracker_domain::entities::notification::NotificationStatus;
use water_tracker_domain::entities::user::User;
use water_tracker_domain::entities::water_log::LogSearchCriteria;

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

/// Offset/limit query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Number of results to skip (default: 0)
    pub offset: Option<usize>,

    /// Number of results to return (default: 20, max: 100)
    pub limit: Option<usize>,
}

impl PaginationParams {
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

impl LimitParams {
    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
    }
}

/// Water log search filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LogQueryParams {
    /// First day, inclusive (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
    pub min_volume: Option<i64>,
    pub max_volume: Option<i64>,
    /// Comma-separated brand names
    pub brand_names: Option<String>,
    /// Comma-separated packaging types
    pub packaging_types: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl LogQueryParams {
    pub fn into_criteria(self) -> LogSearchCriteria {
        LogSearchCriteria {
            brand_names: split_list(&self.brand_names),
            packaging_types: split_list(&self.packaging_types),
            start_date: self.start_date,
            end_date: self.end_date,
            min_volume: self.min_volume,
            max_volume: self.max_volume,
            offset: self.offset.unwrap_or(0),
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateParams {
    /// Day to summarize (YYYY-MM-DD, default: today)
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GoalQueryParams {
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQueryParams {
    pub status: Option<NotificationStatus>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl NotificationQueryParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams { offset: self.offset, limit: self.limit }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GdprQueryParams {
    pub status: Option<GdprRequestStatus>,
}

/// One page of users
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// How many records an operation touched
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: usize,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_is_clamped() {
        let params = PaginationParams { offset: None, limit: Some(1000) };
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), MAX_PAGE_LIMIT);
        assert_eq!(PaginationParams::default().limit(), DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_log_query_splits_lists() {
        let params = LogQueryParams {
            brand_names: Some("Evian, Fiji,,".to_string()),
            packaging_types: None,
            offset: Some(5),
            ..Default::default()
        };
        let criteria = params.into_criteria();
        assert_eq!(criteria.brand_names, vec!["Evian".to_string(), "Fiji".to_string()]);
        assert!(criteria.packaging_types.is_empty());
        assert_eq!(criteria.offset, 5);
    }
}
