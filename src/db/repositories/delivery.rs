use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashSet;

use crate::db::format_timestamp;
use crate::entities::{delivery_records, prelude::*};

/// Rows per INSERT statement, well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 500;

pub struct DeliveryRepository {
    conn: DatabaseConnection,
}

impl DeliveryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn urls_for_search(&self, search_id: i32) -> Result<HashSet<String>> {
        let urls: Vec<String> = DeliveryRecords::find()
            .select_only()
            .column(delivery_records::Column::JobUrl)
            .filter(delivery_records::Column::SearchId.eq(search_id))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(urls.into_iter().collect())
    }

    pub async fn record_all(&self, search_id: i32, urls: &[String]) -> Result<u64> {
        let mut seen = HashSet::new();
        let urls: Vec<&str> = urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty() && seen.insert(*u))
            .collect();

        if urls.is_empty() {
            return Ok(0);
        }

        let sent_at = format_timestamp(chrono::Utc::now());
        let txn = self.conn.begin().await?;
        let mut inserted = 0;

        for chunk in urls.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|url| delivery_records::ActiveModel {
                search_id: Set(search_id),
                job_url: Set((*url).to_string()),
                sent_at: Set(sent_at.clone()),
                ..Default::default()
            });

            inserted += DeliveryRecords::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        delivery_records::Column::SearchId,
                        delivery_records::Column::JobUrl,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn count_for_search(&self, search_id: i32) -> Result<u64> {
        let count = DeliveryRecords::find()
            .filter(delivery_records::Column::SearchId.eq(search_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    pub async fn recent(&self, search_id: i32, limit: u64) -> Result<Vec<DeliveryEntry>> {
        let rows = DeliveryRecords::find()
            .filter(delivery_records::Column::SearchId.eq(search_id))
            .order_by_desc(delivery_records::Column::SentAt)
            .order_by_desc(delivery_records::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| DeliveryEntry {
                search_id: r.search_id,
                job_url: r.job_url,
                sent_at: r.sent_at,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryEntry {
    pub search_id: i32,
    pub job_url: String,
    pub sent_at: String,
}
