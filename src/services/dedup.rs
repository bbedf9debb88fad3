//! Tracks which postings each saved search has already delivered.

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

use crate::db::Store;
use crate::models::posting::Posting;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Returns the postings not yet delivered for `search_id`, in input order.
    /// Postings without a URL are always dropped. If the history cannot be
    /// read, every posting with a URL is returned (fail-open).
    async fn filter_unseen(&self, search_id: i32, postings: Vec<Posting>) -> Vec<Posting>;

    /// Records every posting with a URL as delivered, all or nothing.
    /// Recording an already-delivered posting is a no-op.
    async fn mark_delivered(&self, search_id: i32, postings: &[Posting])
    -> Result<u64, StoreError>;
}

/// Keeps postings with a URL that is not in `seen`.
#[must_use]
pub fn retain_unseen(postings: Vec<Posting>, seen: &HashSet<String>) -> Vec<Posting> {
    postings
        .into_iter()
        .filter(|p| p.has_url() && !seen.contains(p.url.trim()))
        .collect()
}

/// [`DedupStore`] over the `delivery_records` table.
pub struct SeaOrmDedupStore {
    store: Store,
}

impl SeaOrmDedupStore {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DedupStore for SeaOrmDedupStore {
    async fn filter_unseen(&self, search_id: i32, postings: Vec<Posting>) -> Vec<Posting> {
        match self.store.delivered_urls(search_id).await {
            Ok(seen) => retain_unseen(postings, &seen),
            Err(e) => {
                warn!(
                    search_id,
                    phase = "dedup",
                    error = %e,
                    "Delivery history unavailable, treating every posting as unseen"
                );
                metrics::counter!("alert_dedup_fail_open_total").increment(1);
                retain_unseen(postings, &HashSet::new())
            }
        }
    }

    async fn mark_delivered(
        &self,
        search_id: i32,
        postings: &[Posting],
    ) -> Result<u64, StoreError> {
        let urls: Vec<String> = postings
            .iter()
            .filter(|p| p.has_url())
            .map(|p| p.url.trim().to_string())
            .collect();

        Ok(self.store.record_deliveries(search_id, &urls).await?)
    }
}
