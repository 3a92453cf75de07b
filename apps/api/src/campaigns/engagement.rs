//! Post-send engagement tracking (opened / clicked / replied).
//!
//! Rows only move forward along sent → opened → clicked → replied. A late
//! event for an earlier stage is still appended to the audit trail but leaves
//! the status where it is.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::campaigns::store::CampaignStore;
use crate::errors::AppError;
use crate::models::tracking::{EmailEvent, EmailEventType, NewEmailEvent, TrackingStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Opened,
    Clicked,
    Replied,
}

impl EngagementKind {
    pub fn status(self) -> TrackingStatus {
        match self {
            EngagementKind::Opened => TrackingStatus::Opened,
            EngagementKind::Clicked => TrackingStatus::Clicked,
            EngagementKind::Replied => TrackingStatus::Replied,
        }
    }

    pub fn event_type(self) -> EmailEventType {
        match self {
            EngagementKind::Opened => EmailEventType::Opened,
            EngagementKind::Clicked => EmailEventType::Clicked,
            EngagementKind::Replied => EmailEventType::Converted,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRequest {
    pub campaign_contact_id: Uuid,
    pub event_type: EngagementKind,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementResponse {
    pub campaign_contact_id: Uuid,
    pub status: TrackingStatus,
    pub event: EmailEvent,
}

pub async fn record_engagement(
    store: &dyn CampaignStore,
    user_id: Uuid,
    request: EngagementRequest,
) -> Result<EngagementResponse, AppError> {
    let row = store
        .fetch_tracking_row(user_id, request.campaign_contact_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Tracking record {} not found",
                request.campaign_contact_id
            ))
        })?;

    let current = row.tracking_status().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "Tracking record {} has unknown status '{}'",
            row.id,
            row.status
        ))
    })?;
    let current_rank = current.engagement_rank().ok_or_else(|| {
        AppError::Validation(format!(
            "Cannot record engagement for an email that is {}",
            current.as_str()
        ))
    })?;

    let target = request.event_type.status();
    let advance_to = match target.engagement_rank() {
        Some(rank) if rank > current_rank => Some(target),
        _ => None,
    };
    let status = advance_to.unwrap_or(current);

    let event = store
        .apply_engagement(
            advance_to,
            NewEmailEvent {
                campaign_contact_id: row.id,
                event_type: request.event_type.event_type(),
                metadata: request.metadata.unwrap_or_else(|| json!({})),
            },
        )
        .await?;

    info!(
        "Recorded {} for tracking row {} (status now {})",
        request.event_type.event_type().as_str(),
        row.id,
        status.as_str()
    );

    Ok(EngagementResponse {
        campaign_contact_id: row.id,
        status,
        event,
    })
}
