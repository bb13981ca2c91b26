use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "GENERAL")]
    General,
    #[serde(rename = "TRANSFER")]
    Transfer,
}

/// Persisted notification record. Created only by the dispatcher; mutated
/// only by read-acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub citizen_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub description: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Notification {
    /// Structured message pushed over live channels.
    pub fn push_payload(&self) -> serde_json::Value {
        json!({
            "kind": "notification",
            "notification_id": self.notification_id,
            "type": self.kind,
            "description": self.description,
            "created_at": self.created_at.to_rfc3339(),
            "is_read": self.is_read,
            "matching_id": self.matching_id,
            "request_id": self.request_id,
        })
    }
}

/// A notification the orchestration layer wants delivered.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub citizen_id: String,
    pub kind: NotificationType,
    pub description: String,
    pub matching_id: Option<String>,
    pub request_id: Option<String>,
}

impl NotificationRequest {
    pub fn general(citizen_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            citizen_id: citizen_id.into(),
            kind: NotificationType::General,
            description: description.into(),
            matching_id: None,
            request_id: None,
        }
    }

    pub fn transfer(citizen_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            citizen_id: citizen_id.into(),
            kind: NotificationType::Transfer,
            description: description.into(),
            matching_id: None,
            request_id: None,
        }
    }

    pub fn about_match(mut self, matching_id: impl Into<String>) -> Self {
        self.matching_id = Some(matching_id.into());
        self
    }

    pub fn about_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Dedup applies only to correlated notifications; uncorrelated GENERAL
    /// messages may legitimately repeat.
    pub fn is_deduplicated(&self) -> bool {
        self.matching_id.is_some() || self.request_id.is_some()
    }
}
