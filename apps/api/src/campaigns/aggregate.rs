//! Folds per-contact results into the single response returned to the caller.

use serde::Serialize;

use crate::campaigns::dispatch::ContactResult;
use crate::email_client::requires_domain_verification;

const DOMAIN_VERIFICATION_GUIDANCE: &str = "Some emails could not be sent because the sending \
domain is not verified. Verify your domain with the email provider (resend.com/domains) and \
send from an address on that domain, or use a non-free email address on your profile.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub message: String,
    pub results: Vec<ContactResult>,
    pub successful: usize,
    pub failed: usize,
    pub domain_verification_required: bool,
}

pub fn summarize(results: Vec<ContactResult>) -> DispatchSummary {
    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;

    let domain_verification_required = results
        .iter()
        .filter(|r| !r.success)
        .filter_map(|r| r.error.as_deref())
        .any(requires_domain_verification);

    let mut message = format!("Campaign sent: {successful} successful, {failed} failed");
    if domain_verification_required {
        message.push_str(". ");
        message.push_str(DOMAIN_VERIFICATION_GUIDANCE);
    }

    DispatchSummary {
        message,
        results,
        successful,
        failed,
        domain_verification_required,
    }
}
