use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of one contact within one campaign dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Pending,
    Sent,
    Failed,
    Opened,
    Clicked,
    Replied,
}

impl TrackingStatus {
    pub const ALL: [TrackingStatus; 6] = [
        TrackingStatus::Pending,
        TrackingStatus::Sent,
        TrackingStatus::Failed,
        TrackingStatus::Opened,
        TrackingStatus::Clicked,
        TrackingStatus::Replied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Pending => "pending",
            TrackingStatus::Sent => "sent",
            TrackingStatus::Failed => "failed",
            TrackingStatus::Opened => "opened",
            TrackingStatus::Clicked => "clicked",
            TrackingStatus::Replied => "replied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Position on the engagement ladder. `None` for states that cannot be
    /// advanced by engagement tracking.
    pub fn engagement_rank(&self) -> Option<u8> {
        match self {
            TrackingStatus::Sent => Some(0),
            TrackingStatus::Opened => Some(1),
            TrackingStatus::Clicked => Some(2),
            TrackingStatus::Replied => Some(3),
            TrackingStatus::Pending | TrackingStatus::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailEventType {
    Sent,
    Opened,
    Clicked,
    Converted,
}

impl EmailEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailEventType::Sent => "sent",
            EmailEventType::Opened => "opened",
            EmailEventType::Clicked => "clicked",
            EmailEventType::Converted => "converted",
        }
    }
}

/// Per-contact tracking record (`campaign_contacts` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CampaignContact {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CampaignContact {
    pub fn tracking_status(&self) -> Option<TrackingStatus> {
        TrackingStatus::parse(&self.status)
    }
}

/// Append-only audit row (`email_events` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailEvent {
    pub id: Uuid,
    pub campaign_contact_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

/// Insert parameters for an [`EmailEvent`].
#[derive(Debug, Clone)]
pub struct NewEmailEvent {
    pub campaign_contact_id: Uuid,
    pub event_type: EmailEventType,
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in TrackingStatus::ALL {
            assert_eq!(TrackingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TrackingStatus::parse("bounced"), None);
    }

    #[test]
    fn test_only_delivered_states_have_engagement_rank() {
        assert!(TrackingStatus::Pending.engagement_rank().is_none());
        assert!(TrackingStatus::Failed.engagement_rank().is_none());
        assert!(
            TrackingStatus::Sent.engagement_rank() < TrackingStatus::Replied.engagement_rank()
        );
    }
}
