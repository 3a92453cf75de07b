//! Personalization token substitution for campaign subject and content.

use crate::models::contact::Contact;

/// A campaign template rendered for one contact.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizedEmail {
    pub subject: String,
    /// Personalized content as plain text.
    pub body: String,
    /// `body` wrapped in an HTML document, contact values HTML-escaped.
    pub html: String,
}

/// Supported tokens and the contact field each one resolves to.
fn token_values(contact: &Contact) -> [(&'static str, &str); 4] {
    [
        ("{{firstName}}", contact.first_name.as_str()),
        ("{{lastName}}", contact.last_name.as_str()),
        ("{{company}}", contact.company.as_deref().unwrap_or("")),
        ("{{position}}", contact.position.as_deref().unwrap_or("")),
    ]
}

/// Replaces every occurrence of each token; absent fields become "".
pub fn substitute_tokens(template: &str, contact: &Contact) -> String {
    token_values(contact)
        .into_iter()
        .fold(template.to_string(), |acc, (token, value)| acc.replace(token, value))
}

pub fn personalize(subject: &str, content: &str, contact: &Contact) -> PersonalizedEmail {
    let body = substitute_tokens(content, contact);

    // Escape the values before substitution so that a contact field cannot
    // inject markup; the template itself is trusted author content.
    let mut escaped = contact.clone();
    escaped.first_name = escape_html(&contact.first_name);
    escaped.last_name = escape_html(&contact.last_name);
    escaped.company = contact.company.as_deref().map(escape_html);
    escaped.position = contact.position.as_deref().map(escape_html);
    let html = wrap_html(&substitute_tokens(content, &escaped));

    PersonalizedEmail {
        subject: substitute_tokens(subject, contact),
        body,
        html,
    }
}

fn wrap_html(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\n<div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\n{}\n</div>\n</body>\n</html>",
        content.replace("\r\n", "\n").replace('\n', "<br>")
    )
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn contact(first: &str, company: Option<&str>) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: String::new(),
            email: "ana@acme.test".to_string(),
            company: company.map(str::to_string),
            position: None,
            status: "active".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_subject_and_content_personalized() {
        let email = personalize(
            "Hi {{firstName}}",
            "Hello {{firstName}} from {{company}}",
            &contact("Ana", Some("Acme")),
        );
        assert_eq!(email.subject, "Hi Ana");
        assert_eq!(email.body, "Hello Ana from Acme");
        assert!(email.html.contains("Hello Ana from Acme"));
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let email = personalize(
            "{{position}} at {{company}}",
            "{{lastName}}|{{position}}",
            &contact("Ana", None),
        );
        assert_eq!(email.subject, " at ");
        assert_eq!(email.body, "|");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let out = substitute_tokens("{{firstName}}, {{firstName}}!", &contact("Bo", None));
        assert_eq!(out, "Bo, Bo!");
    }

    #[test]
    fn test_unknown_tokens_left_alone() {
        let out = substitute_tokens("Hi {{nickname}}", &contact("Bo", None));
        assert_eq!(out, "Hi {{nickname}}");
    }

    #[test]
    fn test_personalization_is_deterministic() {
        let c = contact("Ana", Some("Acme"));
        assert_eq!(
            personalize("Hi {{firstName}}", "Body {{company}}", &c),
            personalize("Hi {{firstName}}", "Body {{company}}", &c)
        );
    }

    #[test]
    fn test_html_escapes_contact_values_only() {
        let email = personalize(
            "Hi {{firstName}}",
            "<p>Hello {{firstName}}</p>\nBye",
            &contact("<script>x</script>", None),
        );
        assert!(email.html.contains("<p>Hello &lt;script&gt;x&lt;/script&gt;</p><br>Bye"));
        assert_eq!(email.subject, "Hi <script>x</script>");
        assert_eq!(email.body, "<p>Hello <script>x</script></p>\nBye");
    }
}
