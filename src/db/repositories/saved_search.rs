use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use tracing::{info, warn};

use crate::db::{format_timestamp, parse_timestamp};
use crate::entities::{delivery_records, prelude::*, saved_searches};
use crate::models::search::{NewSavedSearch, SavedSearch, SearchTask};

/// LIKE pattern matching every value `format_timestamp` writes. Anything
/// else in `last_run` reads as never run and may be overwritten.
const STORED_TIMESTAMP_SHAPE: &str = "____-__-__T__:__:__.______Z";

/// Outcome of saving a search: identical alerts are not duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSearchResult {
    Created(i32),
    Existing(i32),
}

impl AddSearchResult {
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }
}

pub struct SavedSearchRepository {
    conn: DatabaseConnection,
}

impl SavedSearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: saved_searches::Model) -> SavedSearch {
        let last_run = m.last_run.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!(
                    search_id = m.id,
                    "Unparsable last_run '{}', treating search as never run", raw
                );
            }
            parsed
        });

        SavedSearch {
            id: m.id,
            user_id: m.user_id,
            keyword: m.keyword,
            country: m.country,
            location: m.location,
            language: m.language,
            frequency: m.frequency,
            hours_old: m.hours_old,
            exclude: m.exclude,
            results_wanted: m.results_wanted,
            last_run,
            created_at: m.created_at,
        }
    }

    pub async fn add(&self, user_id: i32, search: &NewSavedSearch) -> Result<AddSearchResult> {
        let location = non_empty(search.location.as_deref());
        let language = non_empty(search.language.as_deref());
        let exclude = non_empty(search.exclude.as_deref());

        let existing = SavedSearches::find()
            .filter(saved_searches::Column::UserId.eq(user_id))
            .filter(saved_searches::Column::Keyword.eq(search.keyword.as_str()))
            .filter(saved_searches::Column::Country.eq(search.country.as_str()))
            .filter(eq_or_null(saved_searches::Column::Location, location.clone()))
            .filter(eq_or_null(saved_searches::Column::Language, language.clone()))
            .filter(eq_or_null(saved_searches::Column::HoursOld, search.hours_old))
            .filter(eq_or_null(saved_searches::Column::Exclude, exclude.clone()))
            .filter(eq_or_null(
                saved_searches::Column::ResultsWanted,
                search.results_wanted,
            ))
            .one(&self.conn)
            .await?;

        if let Some(existing) = existing {
            return Ok(AddSearchResult::Existing(existing.id));
        }

        let frequency = search
            .frequency
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or("hourly")
            .to_lowercase();

        let active_model = saved_searches::ActiveModel {
            user_id: Set(user_id),
            keyword: Set(search.keyword.clone()),
            country: Set(search.country.clone()),
            location: Set(location),
            language: Set(language),
            frequency: Set(frequency),
            hours_old: Set(search.hours_old),
            exclude: Set(exclude),
            results_wanted: Set(search.results_wanted),
            last_run: Set(None),
            created_at: Set(format_timestamp(Utc::now())),
            ..Default::default()
        };

        let res = SavedSearches::insert(active_model).exec(&self.conn).await?;
        info!(
            "Saved search {} for user {}: {}",
            res.last_insert_id, user_id, search.keyword
        );
        Ok(AddSearchResult::Created(res.last_insert_id))
    }

    pub async fn get(&self, id: i32) -> Result<Option<SavedSearch>> {
        let row = SavedSearches::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<SavedSearch>> {
        let rows = SavedSearches::find()
            .filter(saved_searches::Column::UserId.eq(user_id))
            .order_by_desc(saved_searches::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<SavedSearch>> {
        let rows = SavedSearches::find()
            .order_by_asc(saved_searches::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn list_tasks(&self) -> Result<Vec<SearchTask>> {
        let rows = SavedSearches::find()
            .find_also_related(Users)
            .order_by_asc(saved_searches::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(search, owner)| {
                let owner = owner?;
                Some(SearchTask {
                    search: Self::map_model(search),
                    user_email: owner.email,
                    user_name: owner.name,
                })
            })
            .collect())
    }

    pub async fn advance_last_run(&self, search_id: i32, at: DateTime<Utc>) -> Result<bool> {
        let at = format_timestamp(at);

        let result = SavedSearches::update_many()
            .col_expr(saved_searches::Column::LastRun, Expr::value(at.clone()))
            .filter(saved_searches::Column::Id.eq(search_id))
            .filter(
                Condition::any()
                    .add(saved_searches::Column::LastRun.is_null())
                    .add(saved_searches::Column::LastRun.not_like(STORED_TIMESTAMP_SHAPE))
                    .add(saved_searches::Column::LastRun.lte(at)),
            )
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn remove(&self, search_id: i32, user_id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let result = SavedSearches::delete_many()
            .filter(saved_searches::Column::Id.eq(search_id))
            .filter(saved_searches::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        DeliveryRecords::delete_many()
            .filter(delivery_records::Column::SearchId.eq(search_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    pub async fn remove_all_for_user(&self, user_id: i32) -> Result<u64> {
        let txn = self.conn.begin().await?;

        let ids: Vec<i32> = SavedSearches::find()
            .select_only()
            .column(saved_searches::Column::Id)
            .filter(saved_searches::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&txn)
            .await?;

        if ids.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        DeliveryRecords::delete_many()
            .filter(delivery_records::Column::SearchId.is_in(ids.clone()))
            .exec(&txn)
            .await?;

        let result = SavedSearches::delete_many()
            .filter(saved_searches::Column::Id.is_in(ids))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(result.rows_affected)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn eq_or_null<C, V>(column: C, value: Option<V>) -> SimpleExpr
where
    C: ColumnTrait,
    V: Into<sea_orm::Value>,
{
    match value {
        Some(v) => column.eq(v),
        None => column.is_null(),
    }
}
