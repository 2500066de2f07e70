//! Newsletter subscribers and campaigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

/// A newsletter send, or a send recorded for later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub title: String,
    pub message: String,
    pub scheduled_at: Option<String>,
    pub sent_at: Option<String>,
    pub recipient_count: i64,
    pub created_at: String,
}

/// Request body for the public subscribe form.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

impl SubscribeRequest {
    /// Trimmed, lower-cased address, or a validation error.
    pub fn normalized_email(&self) -> Result<String, AppError> {
        let email = self.email.trim().to_lowercase();
        if is_plausible_email(&email) {
            Ok(email)
        } else {
            Err(AppError::Validation("A valid email address is required".to_string()))
        }
    }
}

/// Shape check only: one `@`, a non-empty local part, a dotted domain, no spaces.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Request body for sending (or scheduling) a newsletter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNewsletterRequest {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl SendNewsletterRequest {
    pub fn validate(mut self, now: DateTime<Utc>) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("Message is required".to_string()));
        }
        if matches!(self.scheduled_at, Some(at) if at <= now) {
            return Err(AppError::Validation(
                "scheduledAt must be in the future".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Admin overview of the newsletter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterOverview {
    pub subscribers: Vec<Subscriber>,
    pub campaigns: Vec<Campaign>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_email_shape() {
        assert!(is_plausible_email("marie@example.fr"));
        assert!(!is_plausible_email("marie"));
        assert!(!is_plausible_email("marie@localhost"));
        assert!(!is_plausible_email("ma rie@example.fr"));
        assert!(!is_plausible_email("@example.fr"));
        assert!(!is_plausible_email("a@b@example.fr"));
    }

    #[test]
    fn test_normalized_email() {
        let request = SubscribeRequest {
            email: "  Marie@Example.FR ".to_string(),
        };
        assert_eq!(request.normalized_email().unwrap(), "marie@example.fr");
    }

    #[test]
    fn test_schedule_must_be_future() {
        let now = Utc::now();
        let request = SendNewsletterRequest {
            title: "Avril".to_string(),
            message: "Nouvelles recettes".to_string(),
            scheduled_at: Some(now - Duration::hours(1)),
        };
        assert!(request.validate(now).is_err());

        let request = SendNewsletterRequest {
            title: "Avril".to_string(),
            message: "Nouvelles recettes".to_string(),
            scheduled_at: Some(now + Duration::hours(1)),
        };
        assert!(request.validate(now).is_ok());
    }
}
