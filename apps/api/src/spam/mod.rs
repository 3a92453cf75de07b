// Spam test: deterministic heuristic scoring of campaign subject/content.

pub mod handlers;
pub mod scorer;
