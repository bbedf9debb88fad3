use serde::Serialize;
use serde_json::{Map, Value};

const URL_KEYS: &[&str] = &["job_url", "url"];
const TITLE_KEYS: &[&str] = &["title"];
const COMPANY_KEYS: &[&str] = &["company", "organization"];

/// A job posting returned by the external search. The URL is its only
/// stable identity and doubles as the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posting {
    pub title: String,
    /// Hiring organization.
    pub company: String,
    pub url: String,
    /// Any other fields the search returned, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Posting {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            url: url.into(),
            extra: Map::new(),
        }
    }

    /// Normalizes one raw search record. Returns `None` when the record is
    /// not an object or carries no usable URL.
    #[must_use]
    pub fn from_record(record: Value) -> Option<Self> {
        let Value::Object(mut fields) = record else {
            return None;
        };

        let url = take_string(&mut fields, URL_KEYS)?;
        if url.is_empty() {
            return None;
        }

        let title = take_string(&mut fields, TITLE_KEYS).unwrap_or_default();
        let company = take_string(&mut fields, COMPANY_KEYS).unwrap_or_default();

        Some(Self {
            title,
            company,
            url,
            extra: fields,
        })
    }

    #[must_use]
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

fn take_string(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(value) = fields.remove(*key)
            && found.is_none()
            && let Value::String(s) = value
        {
            found = Some(s.trim().to_string());
        }
    }
    found
}
