use thiserror::Error;
use validator::Validate;
use water_tracker_data::repository::RepositoryError;

/// Errors returned by every domain service
#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller may not touch the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Repository error
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// Insufficient data error
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => ServiceError::ValidationError(msg),
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            _ => ServiceError::RepositoryError(err.to_string()),
        }
    }
}

impl ServiceError {
    /// A stored row could not be turned back into an entity
    pub fn corrupt(msg: String) -> Self {
        ServiceError::RepositoryError(format!("Stored record is invalid: {}", msg))
    }

    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} with ID {} not found", kind, id))
    }
}

/// Run `validator` checks and flatten the field errors into one message
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ServiceError> {
    if let Err(validation_errors) = request.validate() {
        let field_errors = validation_errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| **field);

        let error_message = fields
            .into_iter()
            .map(|(field, errors)| {
                let error_msgs: Vec<String> = errors
                    .iter()
                    .map(|err| {
                        if let Some(msg) = &err.message {
                            msg.to_string()
                        } else {
                            format!("Invalid {}", field)
                        }
                    })
                    .collect();
                format!("{}: {}", field, error_msgs.join(", "))
            })
            .collect::<Vec<String>>()
            .join("; ");

        return Err(ServiceError::ValidationError(error_message));
    }
    Ok(())
}

/// The authenticated caller of a service operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: &str) -> Self {
        Self { user_id: user_id.to_string(), is_admin: false }
    }

    pub fn admin(user_id: &str) -> Self {
        Self { user_id: user_id.to_string(), is_admin: true }
    }

    /// Owners and admins pass
    pub fn ensure_can_access(&self, owner_id: &str) -> Result<(), ServiceError> {
        if self.is_admin || self.user_id == owner_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("You do not have access to this resource".to_string()))
        }
    }

    pub fn ensure_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Administrator role required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::CreateUserRequest;

    #[test]
    fn test_validate_request_joins_field_messages() {
        let request = CreateUserRequest {
            username: "a!".to_string(),
            email: "nope".to_string(),
            daily_goal_ml: Some(10),
        };
        let err = validate_request(&request).unwrap_err();
        let ServiceError::ValidationError(message) = err else {
            panic!("expected a validation error");
        };
        assert!(message.starts_with("daily_goal_ml: Daily goal must be between 250 and 10000 ml"));
        assert!(message.contains("email: Email must be a valid address"));
        assert!(message.contains("username: "));
    }

    #[test]
    fn test_repository_errors_map_to_service_errors() {
        assert_eq!(
            ServiceError::from(RepositoryError::Conflict("dup".to_string())),
            ServiceError::Conflict("dup".to_string())
        );
        assert!(matches!(
            ServiceError::from(RepositoryError::Lock("poisoned".to_string())),
            ServiceError::RepositoryError(_)
        ));
    }

    #[test]
    fn test_actor_access() {
        assert!(Actor::user("a").ensure_can_access("a").is_ok());
        assert!(Actor::user("a").ensure_can_access("b").is_err());
        assert!(Actor::admin("x").ensure_can_access("b").is_ok());
        assert!(Actor::user("a").ensure_admin().is_err());
    }
}
