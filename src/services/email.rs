//! Renders job alert emails.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use std::fmt::Write;

use crate::config::EmailConfig;
use crate::constants::email::{FALLBACK_COMPANY, FALLBACK_TITLE};
use crate::models::posting::Posting;
use crate::services::notifier::AlertMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

#[must_use]
pub fn subject_for(count: usize) -> String {
    format!("Found {count} New Jobs For You!")
}

/// Wraps a posting URL in the click-through redirect endpoint.
#[must_use]
pub fn redirect_url(app_domain: &str, raw_url: &str) -> String {
    format!(
        "{}/api/redirect?data={}",
        app_domain.trim_end_matches('/'),
        URL_SAFE.encode(raw_url.as_bytes())
    )
}

#[must_use]
pub fn unsubscribe_url(app_domain: &str, user_id: i32, search_id: i32) -> String {
    format!(
        "{}/unsubscribe?uid={user_id}&sid={search_id}",
        app_domain.trim_end_matches('/')
    )
}

fn display_title(posting: &Posting) -> &str {
    let title = posting.title.trim();
    if title.is_empty() { FALLBACK_TITLE } else { title }
}

fn display_company(posting: &Posting) -> &str {
    let company = posting.company.trim();
    if company.is_empty() {
        FALLBACK_COMPANY
    } else {
        company
    }
}

pub fn render_alert(alert: &AlertMessage, config: &EmailConfig) -> RenderedEmail {
    let total = alert.postings.len();
    let listed = total.min(config.max_listed_postings.max(1));

    let app_name = html_escape::encode_text(&config.app_name);
    let greeting_name = if alert.recipient_name.trim().is_empty() {
        "there"
    } else {
        alert.recipient_name.trim()
    };

    let mut html = String::with_capacity(1024 + listed * 256);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{app_name}</title></head>\n\
         <body style=\"font-family: Arial, sans-serif; color: #222;\">\n\
         <h2>{app_name}</h2>\n\
         <p>Hi {},</p>\n\
         <p>We found {total} new jobs matching your saved search:</p>\n<ul>\n",
        html_escape::encode_text(greeting_name),
    );

    for posting in alert.postings.iter().take(listed) {
        let link = redirect_url(&config.app_domain, posting.url.trim());
        let _ = writeln!(
            html,
            "<li style=\"margin-bottom: 8px;\"><a href=\"{}\">{}</a> at {}</li>",
            html_escape::encode_double_quoted_attribute(&link),
            html_escape::encode_text(display_title(posting)),
            html_escape::encode_text(display_company(posting)),
        );
    }

    html.push_str("</ul>\n");

    if total > listed {
        let _ = writeln!(html, "<p>...and {} more.</p>", total - listed);
    }

    let unsubscribe = unsubscribe_url(&config.app_domain, alert.user_id, alert.search_id);
    let _ = write!(
        html,
        "<p style=\"font-size: 12px; color: #888;\">You are receiving this because you saved a \
         search on {app_name}. <a href=\"{}\">Unsubscribe</a></p>\n</body>\n</html>\n",
        html_escape::encode_double_quoted_attribute(&unsubscribe),
    );

    RenderedEmail {
        subject: subject_for(total),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(postings: Vec<Posting>) -> AlertMessage {
        AlertMessage {
            recipient_email: "ada@example.com".to_string(),
            recipient_name: "Ada".to_string(),
            user_id: 4,
            search_id: 9,
            postings,
        }
    }

    #[test]
    fn test_redirect_url_is_url_safe_base64() {
        let url = redirect_url("https://jobs.example.com/", "https://x.test/a?b=c&d=e");
        let encoded = url
            .strip_prefix("https://jobs.example.com/api/redirect?data=")
            .unwrap();
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        let decoded = URL_SAFE.decode(encoded).unwrap();
        assert_eq!(decoded, b"https://x.test/a?b=c&d=e");
    }

    #[test]
    fn test_unsubscribe_url() {
        assert_eq!(
            unsubscribe_url("http://localhost:8080", 4, 9),
            "http://localhost:8080/unsubscribe?uid=4&sid=9"
        );
    }

    #[test]
    fn test_render_uses_fallbacks_and_escapes() {
        let email = render_alert(
            &alert(vec![
                Posting::new("", "", "https://a"),
                Posting::new("<Lead> & Co", "R&D GmbH", "https://b"),
            ]),
            &EmailConfig::default(),
        );

        assert_eq!(email.subject, "Found 2 New Jobs For You!");
        assert!(email.html.contains("Job Opening"));
        assert!(email.html.contains("Unknown Company"));
        assert!(email.html.contains("&lt;Lead&gt; &amp; Co"));
        assert!(email.html.contains("R&amp;D GmbH"));
        assert!(email.html.contains("unsubscribe?uid=4&amp;sid=9"));
        assert!(!email.html.contains("https://a\""));
    }

    #[test]
    fn test_render_truncates_long_lists() {
        let postings = (0..30)
            .map(|i| Posting::new(format!("Job {i}"), "Acme", format!("https://j/{i}")))
            .collect();
        let config = EmailConfig {
            max_listed_postings: 25,
            ..EmailConfig::default()
        };

        let email = render_alert(&alert(postings), &config);
        assert_eq!(email.subject, "Found 30 New Jobs For You!");
        assert_eq!(email.html.matches("<li ").count(), 25);
        assert!(email.html.contains("...and 5 more."));
    }
}
