use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::spam::scorer::SpamIssue;

/// Immutable outcome of one spam-test request (`spam_test_results` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SpamTestResult {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub score: f64,
    pub issues: Json<Vec<SpamIssue>>,
    pub tested_at: DateTime<Utc>,
}
