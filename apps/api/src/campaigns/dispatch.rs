//! Batched dispatcher: sends personalized campaign email in fixed-size
//! concurrent batches separated by a fixed delay.
//!
//! Within a batch every send is in flight at once and the batch is joined as a
//! whole; batch N+1 starts only after batch N has fully completed and the
//! delay has elapsed. Each target yields exactly one terminal tracking update
//! and one [`ContactResult`], whatever happens to its send.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::campaigns::personalize::personalize;
use crate::campaigns::store::CampaignStore;
use crate::campaigns::tracking::DispatchTarget;
use crate::email_client::{EmailSender, OutgoingEmail};
use crate::models::campaign::Campaign;
use crate::models::tracking::{EmailEventType, NewEmailEvent};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(1000);

/// Consumer mailbox providers whose addresses cannot be used as a sender.
const FREE_EMAIL_PROVIDERS: &[&str] = &["gmail", "yahoo", "hotmail"];

/// Outcome of one contact's send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResult {
    pub success: bool,
    /// Recipient address.
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContactResult {
    fn sent(contact: &str, email_id: String) -> Self {
        Self {
            success: true,
            contact: contact.to_string(),
            email_id: Some(email_id),
            error: None,
        }
    }

    fn failed(contact: &str, error: String) -> Self {
        Self {
            success: false,
            contact: contact.to_string(),
            email_id: None,
            error: Some(error),
        }
    }
}

/// Picks the `from` address: the caller's own address unless it is missing or
/// belongs to a free consumer provider, in which case the shared fallback.
pub fn sender_address(user_email: Option<&str>, fallback: &str) -> String {
    match user_email {
        Some(email) if !is_free_consumer_address(email) => email.to_string(),
        _ => fallback.to_string(),
    }
}

fn is_free_consumer_address(email: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return true; // not an address we can send from
    };
    let provider = domain.split('.').next().unwrap_or_default().to_lowercase();
    FREE_EMAIL_PROVIDERS.contains(&provider.as_str())
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    batch_size: usize,
    batch_delay: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_BATCH_DELAY)
    }
}

impl Dispatcher {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    pub fn batch_count(&self, contacts: usize) -> usize {
        contacts.div_ceil(self.batch_size)
    }

    /// Number of inter-batch pauses for `contacts` targets: `ceil(n / size) - 1`.
    pub fn delay_count(&self, contacts: usize) -> usize {
        self.batch_count(contacts).saturating_sub(1)
    }

    /// Sends `campaign` to every target and returns one result per target,
    /// in target order.
    pub async fn dispatch(
        &self,
        store: &dyn CampaignStore,
        mailer: &dyn EmailSender,
        from: &str,
        campaign: &Campaign,
        targets: &[DispatchTarget],
    ) -> Vec<ContactResult> {
        let total_batches = self.batch_count(targets.len());
        let mut results = Vec::with_capacity(targets.len());
        info!(
            "Campaign {}: {} contacts in {} batches with {} pauses of {}ms",
            campaign.id,
            targets.len(),
            total_batches,
            self.delay_count(targets.len()),
            self.batch_delay.as_millis()
        );

        for (index, batch) in targets.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            info!(
                "Campaign {}: sending batch {}/{} ({} contacts)",
                campaign.id,
                index + 1,
                total_batches,
                batch.len()
            );

            let batch_results = join_all(
                batch
                    .iter()
                    .map(|target| send_to_target(store, mailer, from, campaign, target)),
            )
            .await;
            results.extend(batch_results);
        }

        results
    }
}

async fn send_to_target(
    store: &dyn CampaignStore,
    mailer: &dyn EmailSender,
    from: &str,
    campaign: &Campaign,
    target: &DispatchTarget,
) -> ContactResult {
    let recipient = target.contact.email.as_str();

    // A panic inside personalization or the provider call must not take the
    // rest of the batch down with it; it becomes this contact's failure.
    let attempt = AssertUnwindSafe(async {
        let personalized = personalize(&campaign.subject, &campaign.content, &target.contact);
        let email = OutgoingEmail {
            from: from.to_string(),
            to: vec![recipient.to_string()],
            subject: personalized.subject,
            html: personalized.html,
            text: personalized.body,
        };
        mailer.send(&email).await
    })
    .catch_unwind()
    .await;

    let outcome = match attempt {
        Ok(Ok(sent)) => Ok(sent),
        Ok(Err(e)) => {
            warn!(status = ?e.status(), "Send to {recipient} failed: {e}");
            Err(e.to_string())
        }
        Err(payload) => {
            let message = format!("Send panicked: {}", panic_message(payload.as_ref()));
            error!("Send to {recipient} aborted: {message}");
            Err(message)
        }
    };

    match outcome {
        Ok(sent) => {
            // The message is out; store problems from here on are logged and
            // do not turn a delivered email into a reported failure.
            if let Err(e) = store.mark_sent(target.tracking_id, Utc::now()).await {
                error!(
                    "Failed to mark tracking row {} as sent: {e}",
                    target.tracking_id
                );
            }
            let event = NewEmailEvent {
                campaign_contact_id: target.tracking_id,
                event_type: EmailEventType::Sent,
                metadata: json!({ "email_id": sent.id, "recipient": recipient }),
            };
            if let Err(e) = store.record_event(event).await {
                warn!(
                    "Failed to record sent event for tracking row {}: {e}",
                    target.tracking_id
                );
            }
            ContactResult::sent(recipient, sent.id)
        }
        Err(message) => {
            if let Err(db) = store.mark_failed(target.tracking_id, &message).await {
                error!(
                    "Failed to mark tracking row {} as failed: {db}",
                    target.tracking_id
                );
            }
            ContactResult::failed(recipient, message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
