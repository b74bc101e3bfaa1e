use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    /// Tokens handed out with a new account
    TokenIssued,
    TokenRefresh,
    TokenRevocation,
    Logout,
    /// Access denied to a resource
    AccessDenied,
    TokenValidation,
    /// Token presented over a WebSocket
    WebSocketAuthentication,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::TokenIssued => write!(f, "TOKEN_ISSUED"),
            AuthEventType::TokenRefresh => write!(f, "TOKEN_REFRESH"),
            AuthEventType::TokenRevocation => write!(f, "TOKEN_REVOCATION"),
            AuthEventType::Logout => write!(f, "LOGOUT"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
            AuthEventType::WebSocketAuthentication => write!(f, "WS_AUTHENTICATION"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// User ID (if known)
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// Request path or channel being accessed
    pub resource: Option<String>,
    pub duration_ms: Option<u64>,
    /// jwt, refresh_token, rbac, websocket
    pub auth_method: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }

    /// One-line rendering used by the log sink
    pub fn log_line(&self) -> String {
        let user_id = self.user_id.as_deref().unwrap_or("anonymous");
        let status = if self.success { "SUCCESS" } else { "FAILURE" };
        let mut line = format!(
            "AUTH-LOG [{}] [{}] [{}] [{}]",
            self.event_type,
            user_id,
            status,
            self.timestamp.to_rfc3339()
        );
        if let Some(resource) = &self.resource {
            line.push_str(&format!(" [{}]", resource));
        }
        if let Some(details) = &self.details {
            line.push(' ');
            line.push_str(details);
        }
        line
    }
}

/// Log an authentication event
pub fn log_auth_event(event: AuthEvent) {
    info!(
        auth_method = event.auth_method.as_deref().unwrap_or("unknown"),
        duration_ms = event.duration_ms.unwrap_or_default(),
        "{}",
        event.log_line()
    );
}

pub fn log_tokens_issued(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::TokenIssued, Some(user_id), true).with_auth_method("jwt"));
}

pub fn log_token_refresh(user_id: &str, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRefresh, Some(user_id), success)
        .with_auth_method("refresh_token");
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

pub fn log_logout(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Logout, Some(user_id), true));
}

pub fn log_token_revocation(user_id: &str, reason: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRevocation, Some(user_id), true);
    if let Some(r) = reason {
        event = event.with_details(r);
    }
    log_auth_event(event);
}

pub fn log_access_denied(user_id: &str, resource: &str, required_roles: &[String]) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, Some(user_id), false)
        .with_resource(resource)
        .with_details(format!("Required roles: {}", required_roles.join(", ")))
        .with_auth_method("rbac");
    log_auth_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_auth_event() {
        let event = AuthEvent::new(AuthEventType::TokenRefresh, Some("user123"), true)
            .with_details("Refreshed from mobile")
            .with_resource("/auth/refresh")
            .with_duration(150)
            .with_auth_method("refresh_token");

        assert_eq!(event.event_type, AuthEventType::TokenRefresh);
        assert_eq!(event.user_id.as_deref(), Some("user123"));
        assert!(event.success);
        assert_eq!(event.details.as_deref(), Some("Refreshed from mobile"));
        assert_eq!(event.resource.as_deref(), Some("/auth/refresh"));
        assert_eq!(event.duration_ms, Some(150));
        assert_eq!(event.auth_method.as_deref(), Some("refresh_token"));
    }

    #[test]
    fn test_log_line() {
        let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
            .with_resource("/api/v1/admin/stats")
            .with_details("Required roles: admin");
        let line = event.log_line();

        assert!(line.starts_with("AUTH-LOG [ACCESS_DENIED] [anonymous] [FAILURE] ["));
        assert!(line.ends_with("[/api/v1/admin/stats] Required roles: admin"));
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(AuthEventType::TokenIssued.to_string(), "TOKEN_ISSUED");
        assert_eq!(AuthEventType::Logout.to_string(), "LOGOUT");
        assert_eq!(AuthEventType::WebSocketAuthentication.to_string(), "WS_AUTHENTICATION");
    }
}
