//! Persistence seam for campaigns, contacts, and delivery tracking.
//!
//! Every query is scoped by `user_id`; the hosted database is shared across
//! users and the service connects with a role that bypasses row-level policies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::campaign::Campaign;
use crate::models::contact::Contact;
use crate::models::spam::SpamTestResult;
use crate::models::tracking::{CampaignContact, EmailEvent, NewEmailEvent, TrackingStatus};

const INSERT_EVENT: &str = r#"
    INSERT INTO email_events (campaign_contact_id, event_type, metadata)
    VALUES ($1, $2, $3)
    RETURNING *
"#;

/// Storage operations used by the dispatch, spam-test, and tracking handlers.
///
/// Carried in `AppState` as `Arc<dyn CampaignStore>`.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn fetch_campaign(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Option<Campaign>, sqlx::Error>;

    async fn fetch_contacts(
        &self,
        user_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<Contact>, sqlx::Error>;

    /// Inserts one `pending` row per contact in a single statement.
    async fn create_tracking_rows(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<CampaignContact>, sqlx::Error>;

    async fn mark_sent(&self, tracking_id: Uuid, sent_at: DateTime<Utc>) -> Result<(), sqlx::Error>;

    async fn mark_failed(&self, tracking_id: Uuid, error: &str) -> Result<(), sqlx::Error>;

    async fn record_event(&self, event: NewEmailEvent) -> Result<EmailEvent, sqlx::Error>;

    async fn save_spam_result(&self, result: &SpamTestResult) -> Result<(), sqlx::Error>;

    async fn fetch_tracking_row(
        &self,
        user_id: Uuid,
        tracking_id: Uuid,
    ) -> Result<Option<CampaignContact>, sqlx::Error>;

    /// Appends an engagement event and, when `advance_to` is set, moves the
    /// row's status in the same transaction.
    async fn apply_engagement(
        &self,
        advance_to: Option<TrackingStatus>,
        event: NewEmailEvent,
    ) -> Result<EmailEvent, sqlx::Error>;

    /// `(status, count)` pairs for one campaign's tracking rows.
    async fn tracking_stats(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Vec<(String, i64)>, sqlx::Error>;
}

/// Postgres-backed store.
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn fetch_campaign(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1 AND user_id = $2")
            .bind(campaign_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn fetch_contacts(
        &self,
        user_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(contact_ids)
            .fetch_all(&self.pool)
            .await
    }

    async fn create_tracking_rows(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<CampaignContact>, sqlx::Error> {
        sqlx::query_as::<_, CampaignContact>(
            r#"
            INSERT INTO campaign_contacts (campaign_id, contact_id, user_id, status)
            SELECT $1::uuid, t.contact_id, $2::uuid, 'pending'
            FROM UNNEST($3::uuid[]) AS t(contact_id)
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(user_id)
        .bind(contact_ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_sent(&self, tracking_id: Uuid, sent_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaign_contacts SET status = 'sent', sent_at = $2 WHERE id = $1")
            .bind(tracking_id)
            .bind(sent_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, tracking_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaign_contacts SET status = 'failed', error_message = $2 WHERE id = $1",
        )
        .bind(tracking_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_event(&self, event: NewEmailEvent) -> Result<EmailEvent, sqlx::Error> {
        sqlx::query_as::<_, EmailEvent>(INSERT_EVENT)
            .bind(event.campaign_contact_id)
            .bind(event.event_type.as_str())
            .bind(&event.metadata)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_spam_result(&self, result: &SpamTestResult) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO spam_test_results (id, campaign_id, score, issues, tested_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(result.id)
        .bind(result.campaign_id)
        .bind(result.score)
        .bind(&result.issues)
        .bind(result.tested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_tracking_row(
        &self,
        user_id: Uuid,
        tracking_id: Uuid,
    ) -> Result<Option<CampaignContact>, sqlx::Error> {
        sqlx::query_as::<_, CampaignContact>(
            "SELECT * FROM campaign_contacts WHERE id = $1 AND user_id = $2",
        )
        .bind(tracking_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn apply_engagement(
        &self,
        advance_to: Option<TrackingStatus>,
        event: NewEmailEvent,
    ) -> Result<EmailEvent, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if let Some(status) = advance_to {
            sqlx::query("UPDATE campaign_contacts SET status = $2 WHERE id = $1")
                .bind(event.campaign_contact_id)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let recorded = sqlx::query_as::<_, EmailEvent>(INSERT_EVENT)
            .bind(event.campaign_contact_id)
            .bind(event.event_type.as_str())
            .bind(&event.metadata)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(recorded)
    }

    async fn tracking_stats(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM campaign_contacts
            WHERE campaign_id = $1 AND user_id = $2
            GROUP BY status
            "#,
        )
        .bind(campaign_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory store used by handler and pipeline tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct Tables {
        pub campaigns: Vec<Campaign>,
        pub contacts: Vec<Contact>,
        pub tracking: Vec<CampaignContact>,
        pub events: Vec<EmailEvent>,
        pub spam_results: Vec<SpamTestResult>,
        /// Number of terminal (`sent`/`failed`) updates per tracking row.
        pub terminal_updates: HashMap<Uuid, u32>,
    }

    #[derive(Default)]
    pub struct MemoryStore {
        pub tables: Mutex<Tables>,
        pub fail_tracking_insert: bool,
        pub fail_spam_save: bool,
        pub fail_mark_sent: bool,
        pub fail_event_insert: bool,
    }

    fn injected(what: &str) -> sqlx::Error {
        sqlx::Error::Protocol(format!("injected failure: {what}"))
    }

    impl MemoryStore {
        pub fn with(campaigns: Vec<Campaign>, contacts: Vec<Contact>) -> Self {
            let store = Self::default();
            {
                let mut tables = store.tables.lock().unwrap();
                tables.campaigns = campaigns;
                tables.contacts = contacts;
            }
            store
        }

        pub fn tracking(&self) -> Vec<CampaignContact> {
            self.tables.lock().unwrap().tracking.clone()
        }

        pub fn events(&self) -> Vec<EmailEvent> {
            self.tables.lock().unwrap().events.clone()
        }

        pub fn set_status(&self, tracking_id: Uuid, status: TrackingStatus) {
            let mut tables = self.tables.lock().unwrap();
            if let Some(row) = tables.tracking.iter_mut().find(|r| r.id == tracking_id) {
                row.status = status.as_str().to_string();
            }
        }

        fn push_event(tables: &mut Tables, event: NewEmailEvent) -> EmailEvent {
            let recorded = EmailEvent {
                id: Uuid::new_v4(),
                campaign_contact_id: event.campaign_contact_id,
                event_type: event.event_type.as_str().to_string(),
                timestamp: Utc::now(),
                metadata: event.metadata,
            };
            tables.events.push(recorded.clone());
            recorded
        }

        pub fn terminal_updates(&self, tracking_id: Uuid) -> u32 {
            self.tables
                .lock()
                .unwrap()
                .terminal_updates
                .get(&tracking_id)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl CampaignStore for MemoryStore {
        async fn fetch_campaign(
            &self,
            user_id: Uuid,
            campaign_id: Uuid,
        ) -> Result<Option<Campaign>, sqlx::Error> {
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .campaigns
                .iter()
                .find(|c| c.id == campaign_id && c.user_id == user_id)
                .cloned())
        }

        async fn fetch_contacts(
            &self,
            user_id: Uuid,
            contact_ids: &[Uuid],
        ) -> Result<Vec<Contact>, sqlx::Error> {
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .contacts
                .iter()
                .filter(|c| c.user_id == user_id && contact_ids.contains(&c.id))
                .cloned()
                .collect())
        }

        async fn create_tracking_rows(
            &self,
            user_id: Uuid,
            campaign_id: Uuid,
            contact_ids: &[Uuid],
        ) -> Result<Vec<CampaignContact>, sqlx::Error> {
            if self.fail_tracking_insert {
                return Err(injected("tracking insert"));
            }
            let rows: Vec<CampaignContact> = contact_ids
                .iter()
                .map(|&contact_id| CampaignContact {
                    id: Uuid::new_v4(),
                    campaign_id,
                    contact_id,
                    user_id,
                    status: TrackingStatus::Pending.as_str().to_string(),
                    sent_at: None,
                    error_message: None,
                    created_at: Utc::now(),
                })
                .collect();
            self.tables.lock().unwrap().tracking.extend(rows.iter().cloned());
            Ok(rows)
        }

        async fn mark_sent(&self, tracking_id: Uuid, sent_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
            if self.fail_mark_sent {
                return Err(injected("mark sent"));
            }
            let mut tables = self.tables.lock().unwrap();
            if let Some(row) = tables.tracking.iter_mut().find(|r| r.id == tracking_id) {
                row.status = TrackingStatus::Sent.as_str().to_string();
                row.sent_at = Some(sent_at);
            }
            *tables.terminal_updates.entry(tracking_id).or_default() += 1;
            Ok(())
        }

        async fn mark_failed(&self, tracking_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
            let mut tables = self.tables.lock().unwrap();
            if let Some(row) = tables.tracking.iter_mut().find(|r| r.id == tracking_id) {
                row.status = TrackingStatus::Failed.as_str().to_string();
                row.error_message = Some(error.to_string());
            }
            *tables.terminal_updates.entry(tracking_id).or_default() += 1;
            Ok(())
        }

        async fn record_event(&self, event: NewEmailEvent) -> Result<EmailEvent, sqlx::Error> {
            if self.fail_event_insert {
                return Err(injected("event insert"));
            }
            Ok(Self::push_event(&mut self.tables.lock().unwrap(), event))
        }

        async fn save_spam_result(&self, result: &SpamTestResult) -> Result<(), sqlx::Error> {
            if self.fail_spam_save {
                return Err(injected("spam result insert"));
            }
            self.tables.lock().unwrap().spam_results.push(result.clone());
            Ok(())
        }

        async fn fetch_tracking_row(
            &self,
            user_id: Uuid,
            tracking_id: Uuid,
        ) -> Result<Option<CampaignContact>, sqlx::Error> {
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .tracking
                .iter()
                .find(|r| r.id == tracking_id && r.user_id == user_id)
                .cloned())
        }

        async fn apply_engagement(
            &self,
            advance_to: Option<TrackingStatus>,
            event: NewEmailEvent,
        ) -> Result<EmailEvent, sqlx::Error> {
            // All-or-nothing, like the transaction in the Postgres store.
            if self.fail_event_insert {
                return Err(injected("event insert"));
            }
            let mut tables = self.tables.lock().unwrap();
            if let Some(status) = advance_to {
                let id = event.campaign_contact_id;
                if let Some(row) = tables.tracking.iter_mut().find(|r| r.id == id) {
                    row.status = status.as_str().to_string();
                }
            }
            Ok(Self::push_event(&mut tables, event))
        }

        async fn tracking_stats(
            &self,
            user_id: Uuid,
            campaign_id: Uuid,
        ) -> Result<Vec<(String, i64)>, sqlx::Error> {
            let tables = self.tables.lock().unwrap();
            let mut counts: HashMap<String, i64> = HashMap::new();
            for row in tables
                .tracking
                .iter()
                .filter(|r| r.campaign_id == campaign_id && r.user_id == user_id)
            {
                *counts.entry(row.status.clone()).or_default() += 1;
            }
            Ok(counts.into_iter().collect())
        }
    }
}
