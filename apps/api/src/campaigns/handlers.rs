//! Axum route handlers for campaign dispatch, engagement tracking, and stats.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::campaigns::aggregate::{summarize, DispatchSummary};
use crate::campaigns::dispatch::{sender_address, Dispatcher};
use crate::campaigns::engagement::{record_engagement, EngagementRequest, EngagementResponse};
use crate::campaigns::store::CampaignStore;
use crate::campaigns::tracking::initialize_tracking;
use crate::email_client::EmailSender;
use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::models::tracking::TrackingStatus;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCampaignRequest {
    pub campaign_id: Uuid,
    pub contact_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CampaignStats {
    pub campaign_id: Uuid,
    pub total: i64,
    pub pending: i64,
    pub sent: i64,
    pub failed: i64,
    pub opened: i64,
    pub clicked: i64,
    pub replied: i64,
}

/// Per-invocation collaborators for a dispatch run.
pub struct DispatchContext<'a> {
    pub store: &'a dyn CampaignStore,
    pub mailer: &'a dyn EmailSender,
    pub dispatcher: &'a Dispatcher,
    pub fallback_sender: &'a str,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/campaigns/send
///
/// Creates tracking rows, sends in batches, and returns one aggregated summary.
/// Per-contact failures are reported in `results`; only setup failures fail
/// the request.
pub async fn handle_send_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<SendCampaignRequest>,
) -> Result<Json<DispatchSummary>, AppError> {
    let ctx = DispatchContext {
        store: state.store.as_ref(),
        mailer: state.mailer.as_ref(),
        dispatcher: &state.dispatcher,
        fallback_sender: &state.config.fallback_sender,
    };
    let summary = send_campaign(&ctx, &user, &request).await?;
    Ok(Json(summary))
}

/// POST /api/v1/tracking/events
pub async fn handle_tracking_event(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<EngagementRequest>,
) -> Result<Json<EngagementResponse>, AppError> {
    let response = record_engagement(state.store.as_ref(), user.id, request).await?;
    Ok(Json(response))
}

/// GET /api/v1/campaigns/:id/stats
pub async fn handle_campaign_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignStats>, AppError> {
    let stats = campaign_stats(state.store.as_ref(), user.id, campaign_id).await?;
    Ok(Json(stats))
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline entry points
// ────────────────────────────────────────────────────────────────────────────

pub async fn send_campaign(
    ctx: &DispatchContext<'_>,
    user: &AuthUser,
    request: &SendCampaignRequest,
) -> Result<DispatchSummary, AppError> {
    let prepared =
        initialize_tracking(ctx.store, user.id, request.campaign_id, &request.contact_ids).await?;

    let from = sender_address(user.email.as_deref(), ctx.fallback_sender);
    let results = ctx
        .dispatcher
        .dispatch(ctx.store, ctx.mailer, &from, &prepared.campaign, &prepared.targets)
        .await;

    let summary = summarize(results);
    info!(
        "Campaign {} dispatched by {}: {} sent, {} failed",
        request.campaign_id, user.id, summary.successful, summary.failed
    );
    Ok(summary)
}

pub async fn campaign_stats(
    store: &dyn CampaignStore,
    user_id: Uuid,
    campaign_id: Uuid,
) -> Result<CampaignStats, AppError> {
    store
        .fetch_campaign(user_id, campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id} not found")))?;

    let mut stats = CampaignStats {
        campaign_id,
        ..Default::default()
    };
    for (status, count) in store.tracking_stats(user_id, campaign_id).await? {
        stats.total += count;
        match TrackingStatus::parse(&status) {
            Some(TrackingStatus::Pending) => stats.pending += count,
            Some(TrackingStatus::Sent) => stats.sent += count,
            Some(TrackingStatus::Failed) => stats.failed += count,
            Some(TrackingStatus::Opened) => stats.opened += count,
            Some(TrackingStatus::Clicked) => stats.clicked += count,
            Some(TrackingStatus::Replied) => stats.replied += count,
            None => {}
        }
    }
    Ok(stats)
}
