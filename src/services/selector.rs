//! Decides whether a saved search is eligible to run.

use chrono::{DateTime, Utc};

use crate::models::search::{Frequency, SavedSearch};

/// A search that has never run is always due. Otherwise it becomes due once
/// its frequency interval has fully elapsed since `last_run`.
#[must_use]
pub fn is_due(frequency: Frequency, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let Some(last_run) = last_run else {
        return true;
    };

    last_run
        .checked_add_signed(frequency.interval())
        .is_some_and(|next_eligible| now >= next_eligible)
}

/// [`is_due`] for a stored search, reading its raw frequency leniently.
#[must_use]
pub fn search_is_due(search: &SavedSearch, now: DateTime<Utc>) -> bool {
    is_due(search.frequency(), search.last_run, now)
}
