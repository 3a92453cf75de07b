// Campaign dispatch pipeline:
// tracking-row setup → personalization → batched sending → result aggregation.
// Engagement tracking and per-campaign stats live alongside it.

pub mod aggregate;
pub mod dispatch;
pub mod engagement;
pub mod handlers;
pub mod personalize;
pub mod store;
pub mod tracking;
