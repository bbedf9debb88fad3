use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How often a saved search may run.
///
/// Stored as free text. Anything unrecognised is treated as hourly so a bad
/// value can never stall the alert cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Hourly,
    Daily,
}

impl Frequency {
    #[must_use]
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            _ => Self::Hourly,
        }
    }

    #[must_use]
    pub const fn interval(self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::Daily => Duration::hours(24),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedSearch {
    pub id: i32,
    pub user_id: i32,
    pub keyword: String,
    pub country: String,
    pub location: Option<String>,
    pub language: Option<String>,
    /// Raw stored value; see [`Frequency::parse_lossy`].
    pub frequency: String,
    pub hours_old: Option<i32>,
    pub exclude: Option<String>,
    pub results_wanted: Option<i32>,
    pub last_run: Option<DateTime<Utc>>,
    pub created_at: String,
}

impl SavedSearch {
    #[must_use]
    pub fn frequency(&self) -> Frequency {
        Frequency::parse_lossy(&self.frequency)
    }
}

/// Input for creating a saved search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSavedSearch {
    pub keyword: String,
    pub country: String,
    pub location: Option<String>,
    pub language: Option<String>,
    pub frequency: Option<String>,
    pub hours_old: Option<i32>,
    pub exclude: Option<String>,
    pub results_wanted: Option<i32>,
}

/// A saved search joined with its owner's contact details, as captured at
/// the start of an alert cycle.
#[derive(Debug, Clone)]
pub struct SearchTask {
    pub search: SavedSearch,
    pub user_email: String,
    pub user_name: String,
}

/// Parameters handed to the external job search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub keyword: String,
    pub country: String,
    pub location: Option<String>,
    pub local_language: Option<String>,
    pub hours_old: Option<u32>,
    pub exclude: Option<String>,
    pub results_wanted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parsing() {
        assert_eq!(Frequency::parse_lossy("hourly"), Frequency::Hourly);
        assert_eq!(Frequency::parse_lossy("Daily"), Frequency::Daily);
        assert_eq!(Frequency::parse_lossy(" daily "), Frequency::Daily);
        assert_eq!(Frequency::parse_lossy("weekly"), Frequency::Hourly);
        assert_eq!(Frequency::parse_lossy(""), Frequency::Hourly);
    }

    #[test]
    fn test_frequency_interval() {
        assert_eq!(Frequency::Hourly.interval(), Duration::hours(1));
        assert_eq!(Frequency::Daily.interval(), Duration::hours(24));
    }
}
