//! Email client: the single point of entry for transactional email in this service.
//!
//! Dispatch code talks to the [`EmailSender`] trait; [`ResendClient`] is the
//! production backend. Nothing else calls the provider API directly.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Substring the provider uses when the `from` domain has not been verified.
/// Example wording: "You can only send testing emails to your own email
/// address. To send emails to other recipients, please verify a domain at
/// resend.com/domains, and change the `from` address to an email using this domain."
const DOMAIN_VERIFICATION_MARKER: &str = "verify a domain";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered and rejected the message.
    #[error("{message}")]
    Provider { status: u16, message: String },
}

impl EmailError {
    /// HTTP status returned by the provider, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            EmailError::Http(e) => e.status().map(|s| s.as_u16()),
            EmailError::Provider { status, .. } => Some(*status),
        }
    }
}

/// One fully personalized message ready to hand to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, EmailError>;
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}

/// Resend transactional email API. No retries: the dispatcher's inter-batch
/// delay is the only rate limiting applied.
#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
}

impl ResendClient {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, EmailError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider {
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }

        let sent: SentEmail = response.json().await?;
        debug!("Provider accepted email {} for {:?}", sent.id, email.to);
        Ok(sent)
    }
}

/// Pulls the human-readable message out of a provider error body, falling back
/// to the raw body when it is not the expected JSON shape.
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ResendErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}

/// True when a send failure means the sending domain must be verified with the
/// provider before mail can reach arbitrary recipients.
///
/// This depends on the provider's error wording; if that wording changes the
/// classification silently stops firing.
pub fn requires_domain_verification(error: &str) -> bool {
    error.to_lowercase().contains(DOMAIN_VERIFICATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_provider_wording_requires_domain_verification() {
        let message = "You can only send testing emails to your own email address (me@example.com). \
                       To send emails to other recipients, please verify a domain at resend.com/domains, \
                       and change the `from` address to an email using this domain.";
        assert!(requires_domain_verification(message));
    }

    #[test]
    fn test_unrelated_errors_do_not_require_domain_verification() {
        assert!(!requires_domain_verification("Rate limit exceeded"));
        assert!(!requires_domain_verification("Invalid `to` field"));
    }

    #[test]
    fn test_provider_error_message_parses_json_body() {
        let body = r#"{"statusCode":403,"message":"please verify a domain","name":"validation_error"}"#;
        assert_eq!(provider_error_message(body), "please verify a domain");
    }

    #[test]
    fn test_provider_error_message_falls_back_to_raw_body() {
        assert_eq!(provider_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_provider_error_displays_provider_text() {
        let err = EmailError::Provider {
            status: 422,
            message: "Invalid `from` field".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid `from` field");
    }
}
