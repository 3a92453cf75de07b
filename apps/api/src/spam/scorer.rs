//! Spam scoring: a fixed, rule-based deliverability heuristic.
//!
//! Start at 10.0 and deduct per finding:
//! - subject trigger word (each)           high    −2.0
//! - subject longer than 50 / under 10     medium  −0.5
//! - subject more than 30% capitals        high    −1.5
//! - more than 3 `!` in content            medium  −1.0
//! - content spam phrase (each, once)      medium  −1.0
//! - no "unsubscribe" in content           high    −2.0
//! - text-to-HTML ratio below 0.3          medium  −1.0
//!
//! Floored at 0.0 and rounded to one decimal. Pure: same input, same report.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: f64 = 10.0;

const SUBJECT_TRIGGER_WORDS: &[&str] = &[
    "FREE",
    "URGENT",
    "LIMITED TIME",
    "CLICK NOW",
    "GUARANTEED",
    "AMAZING",
    "INCREDIBLE",
];

const CONTENT_SPAM_PHRASES: &[&str] = &[
    "CLICK HERE",
    "CALL NOW",
    "ORDER NOW",
    "BUY NOW",
    "SPECIAL PROMOTION",
];

const SUBJECT_MAX_CHARS: usize = 50;
const SUBJECT_MIN_CHARS: usize = 10;
const MAX_CAPS_RATIO: f64 = 0.3;
const MAX_EXCLAMATIONS: usize = 3;
const MIN_TEXT_RATIO: f64 = 0.3;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").expect("valid tag pattern");
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpamIssue {
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpamReport {
    pub score: f64,
    pub issues: Vec<SpamIssue>,
}

struct Tally {
    score: f64,
    issues: Vec<SpamIssue>,
}

impl Tally {
    fn flag(&mut self, severity: Severity, penalty: f64, message: String, suggestion: &str) {
        self.score -= penalty;
        self.issues.push(SpamIssue {
            severity,
            message,
            suggestion: suggestion.to_string(),
        });
    }
}

pub fn score_email(subject: &str, content: &str) -> SpamReport {
    let mut tally = Tally {
        score: MAX_SCORE,
        issues: Vec::new(),
    };

    let subject_upper = subject.to_uppercase();
    for &word in SUBJECT_TRIGGER_WORDS {
        if subject_upper.contains(word) {
            tally.flag(
                Severity::High,
                2.0,
                format!("Subject contains spam trigger word: \"{word}\""),
                "Rephrase the subject without promotional trigger words",
            );
        }
    }

    let subject_len = subject.chars().count();
    if subject_len > SUBJECT_MAX_CHARS {
        tally.flag(
            Severity::Medium,
            0.5,
            format!("Subject is too long ({subject_len} characters)"),
            "Keep the subject under 50 characters",
        );
    } else if subject_len < SUBJECT_MIN_CHARS {
        tally.flag(
            Severity::Medium,
            0.5,
            format!("Subject is too short ({subject_len} characters)"),
            "Use at least 10 characters so the subject is descriptive",
        );
    }

    if caps_ratio(subject) > MAX_CAPS_RATIO {
        tally.flag(
            Severity::High,
            1.5,
            "Subject uses excessive capital letters".to_string(),
            "Write the subject in sentence case",
        );
    }

    let exclamations = content.matches('!').count();
    if exclamations > MAX_EXCLAMATIONS {
        tally.flag(
            Severity::Medium,
            1.0,
            format!("Content has {exclamations} exclamation marks"),
            "Use at most 3 exclamation marks",
        );
    }

    let content_upper = content.to_uppercase();
    for &phrase in CONTENT_SPAM_PHRASES {
        if content_upper.contains(phrase) {
            tally.flag(
                Severity::Medium,
                1.0,
                format!("Content contains spam phrase: \"{phrase}\""),
                "Replace pushy calls to action with a specific, personal ask",
            );
        }
    }

    if !content_upper.contains("UNSUBSCRIBE") {
        tally.flag(
            Severity::High,
            2.0,
            "Content has no unsubscribe option".to_string(),
            "Add an unsubscribe link or instructions to the footer",
        );
    }

    if let Some(ratio) = text_to_html_ratio(content) {
        if ratio < MIN_TEXT_RATIO {
            tally.flag(
                Severity::Medium,
                1.0,
                format!("Low text-to-HTML ratio ({:.0}%)", ratio * 100.0),
                "Add more readable text relative to markup",
            );
        }
    }

    SpamReport {
        score: round_score(tally.score),
        issues: tally.issues,
    }
}

/// Share of the subject's characters that are uppercase letters. 0 when empty.
fn caps_ratio(subject: &str) -> f64 {
    let total = subject.chars().count();
    if total == 0 {
        return 0.0;
    }
    let caps = subject.chars().filter(|c| c.is_uppercase()).count();
    caps as f64 / total as f64
}

/// Length of the content with tags stripped over its raw length.
/// `None` for empty content.
fn text_to_html_ratio(content: &str) -> Option<f64> {
    let raw = content.chars().count();
    if raw == 0 {
        return None;
    }
    let text = HTML_TAG.replace_all(content, "").chars().count();
    Some(text as f64 / raw as f64)
}

fn round_score(score: f64) -> f64 {
    (score.max(0.0) * 10.0).round() / 10.0
}
