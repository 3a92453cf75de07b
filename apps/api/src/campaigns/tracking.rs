//! Tracking-record initialization: validates ownership and writes one
//! `pending` row per contact before any email leaves the service.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use tracing::info;
use uuid::Uuid;

use crate::campaigns::store::CampaignStore;
use crate::errors::AppError;
use crate::models::campaign::Campaign;
use crate::models::contact::Contact;

/// One contact paired with the tracking row created for it.
#[derive(Debug, Clone)]
pub struct DispatchTarget {
    pub tracking_id: Uuid,
    pub contact: Contact,
}

#[derive(Debug, Clone)]
pub struct PreparedDispatch {
    pub campaign: Campaign,
    /// In the order the contact ids were requested.
    pub targets: Vec<DispatchTarget>,
}

/// Collapses repeated ids, keeping the first occurrence's position.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Loads the campaign and contacts for `user_id` and bulk-creates the pending
/// tracking rows. Nothing is written unless both lookups succeed in full.
pub async fn initialize_tracking(
    store: &dyn CampaignStore,
    user_id: Uuid,
    campaign_id: Uuid,
    contact_ids: &[Uuid],
) -> Result<PreparedDispatch, AppError> {
    let contact_ids = dedup_ids(contact_ids);
    if contact_ids.is_empty() {
        return Err(AppError::Validation("contactIds cannot be empty".to_string()));
    }

    let campaign = store
        .fetch_campaign(user_id, campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id} not found")))?;

    let contacts = store.fetch_contacts(user_id, &contact_ids).await?;
    if contacts.len() != contact_ids.len() {
        return Err(AppError::Unauthorized(format!(
            "{} of {} contacts were not found or do not belong to the caller",
            contact_ids.len() - contacts.len(),
            contact_ids.len()
        )));
    }

    let rows = store
        .create_tracking_rows(user_id, campaign_id, &contact_ids)
        .await?;

    let mut tracking_by_contact: HashMap<Uuid, Uuid> =
        rows.iter().map(|r| (r.contact_id, r.id)).collect();
    let mut contacts_by_id: HashMap<Uuid, Contact> =
        contacts.into_iter().map(|c| (c.id, c)).collect();

    let targets = contact_ids
        .iter()
        .map(|id| {
            let tracking_id = tracking_by_contact
                .remove(id)
                .ok_or_else(|| anyhow!("No tracking row was created for contact {id}"))?;
            let contact = contacts_by_id
                .remove(id)
                .ok_or_else(|| anyhow!("Contact {id} vanished during dispatch setup"))?;
            Ok(DispatchTarget {
                tracking_id,
                contact,
            })
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;

    info!(
        "Created {} pending tracking rows for campaign {campaign_id}",
        targets.len()
    );

    Ok(PreparedDispatch { campaign, targets })
}
