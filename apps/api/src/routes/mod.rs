pub mod health;

use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::campaigns::handlers;
use crate::spam::handlers as spam_handlers;
use crate::state::AppState;

/// Headers the web client sends with every function call.
fn allowed_headers() -> [HeaderName; 4] {
    [
        header::AUTHORIZATION,
        HeaderName::from_static("x-client-info"),
        HeaderName::from_static("apikey"),
        header::CONTENT_TYPE,
    ]
}

/// Any origin may call the API; pre-flight requests are answered here with an
/// empty body before reaching a handler.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Non-POST methods on these routes are answered with 405 by the router.
        .route("/api/v1/campaigns/send", post(handlers::handle_send_campaign))
        .route(
            "/api/v1/campaigns/spam-test",
            post(spam_handlers::handle_spam_test),
        )
        .route(
            "/api/v1/campaigns/:id/stats",
            get(handlers::handle_campaign_stats),
        )
        .route(
            "/api/v1/tracking/events",
            post(handlers::handle_tracking_event),
        )
        .with_state(state)
        .layer(cors_layer())
}
