use std::sync::Arc;

use crate::auth::AuthClient;
use crate::campaigns::dispatch::Dispatcher;
use crate::campaigns::store::CampaignStore;
use crate::config::Config;
use crate::email_client::EmailSender;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds no per-request data: every dispatch builds its own working set from
/// these clients and drops it when the response is sent.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth: AuthClient,
    /// Pluggable store. Default: PgCampaignStore over the hosted database.
    pub store: Arc<dyn CampaignStore>,
    /// Pluggable email backend. Default: ResendClient.
    pub mailer: Arc<dyn EmailSender>,
    pub dispatcher: Dispatcher,
}
