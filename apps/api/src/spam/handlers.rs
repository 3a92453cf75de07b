//! Axum route handler for the spam-test endpoint.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json as JsonColumn;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::campaigns::store::CampaignStore;
use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::models::spam::SpamTestResult;
use crate::spam::scorer::score_email;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamTestRequest {
    pub campaign_id: Uuid,
    pub subject: String,
    pub content: String,
}

/// POST /api/v1/campaigns/spam-test
pub async fn handle_spam_test(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<SpamTestRequest>,
) -> Result<Json<SpamTestResult>, AppError> {
    let result = run_spam_test(state.store.as_ref(), user.id, request).await?;
    Ok(Json(result))
}

/// Scores the submitted subject/content and records the result. A failed
/// write is logged; the caller still gets the score.
pub async fn run_spam_test(
    store: &dyn CampaignStore,
    user_id: Uuid,
    request: SpamTestRequest,
) -> Result<SpamTestResult, AppError> {
    store
        .fetch_campaign(user_id, request.campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", request.campaign_id)))?;

    let report = score_email(&request.subject, &request.content);
    let result = SpamTestResult {
        id: Uuid::new_v4(),
        campaign_id: request.campaign_id,
        score: report.score,
        issues: JsonColumn(report.issues),
        tested_at: Utc::now(),
    };

    if let Err(e) = store.save_spam_result(&result).await {
        error!("Failed to save spam test result {}: {e}", result.id);
    }

    info!(
        "Spam test for campaign {}: score {:.1} with {} issues",
        result.campaign_id,
        result.score,
        result.issues.len()
    );
    Ok(result)
}
