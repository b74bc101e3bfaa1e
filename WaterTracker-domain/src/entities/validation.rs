//! Field validators shared by request payloads

use std::borrow::Cow;
use chrono::NaiveTime;
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Usernames are ASCII letters, digits and underscores
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(error("username_charset", "Username may only contain letters, digits and underscores"))
    }
}

/// Parse a 24-hour "HH:MM" time of day
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    if value.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Validator wrapper around [`parse_time_of_day`]
pub fn validate_time_of_day(value: &str) -> Result<(), ValidationError> {
    parse_time_of_day(value)
        .map(|_| ())
        .ok_or_else(|| error("time_of_day", "Time must use the 24-hour HH:MM format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_charset() {
        assert!(validate_username("water_lover_42").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[test]
    fn test_time_of_day() {
        assert_eq!(parse_time_of_day("07:05"), NaiveTime::from_hms_opt(7, 5, 0));
        assert!(parse_time_of_day("7:05").is_none());
        assert!(parse_time_of_day("24:00").is_none());
        assert!(validate_time_of_day("23:59").is_ok());
        assert!(validate_time_of_day("noon").is_err());
    }
}
