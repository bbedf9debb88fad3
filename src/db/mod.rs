use crate::models::search::{NewSavedSearch, SavedSearch, SearchTask};
use crate::models::user::User;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::delivery::DeliveryEntry;
pub use repositories::saved_search::AddSearchResult;

/// Formats a timestamp the way every timestamp column is stored: fixed
/// width RFC 3339 in UTC, so string comparison matches time order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to `:memory:` would see its own empty database.
        let max_connections = if in_memory { 1 } else { max_connections };
        let min_connections = min_connections.min(max_connections);

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn search_repo(&self) -> repositories::saved_search::SavedSearchRepository {
        repositories::saved_search::SavedSearchRepository::new(self.conn.clone())
    }

    fn delivery_repo(&self) -> repositories::delivery::DeliveryRepository {
        repositories::delivery::DeliveryRepository::new(self.conn.clone())
    }

    // Users

    pub async fn add_user(&self, email: &str, name: &str, plan: &str) -> Result<i32> {
        self.user_repo().add(email, name, plan).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn remove_user(&self, email: &str) -> Result<bool> {
        self.user_repo().remove(email).await
    }

    // Saved searches

    pub async fn add_saved_search(
        &self,
        user_id: i32,
        search: &NewSavedSearch,
    ) -> Result<AddSearchResult> {
        self.search_repo().add(user_id, search).await
    }

    pub async fn get_saved_search(&self, id: i32) -> Result<Option<SavedSearch>> {
        self.search_repo().get(id).await
    }

    pub async fn list_searches_for_user(&self, user_id: i32) -> Result<Vec<SavedSearch>> {
        self.search_repo().list_for_user(user_id).await
    }

    pub async fn list_all_searches(&self) -> Result<Vec<SavedSearch>> {
        self.search_repo().list_all().await
    }

    /// Snapshot of every saved search joined with its owner's contact info.
    pub async fn list_search_tasks(&self) -> Result<Vec<SearchTask>> {
        self.search_repo().list_tasks().await
    }

    /// Sets `last_run` to `at` unless the stored value is already later.
    /// Returns whether a row changed.
    pub async fn advance_last_run(&self, search_id: i32, at: DateTime<Utc>) -> Result<bool> {
        self.search_repo().advance_last_run(search_id, at).await
    }

    /// Removes a saved search owned by `user_id` along with its delivery records.
    pub async fn remove_saved_search(&self, search_id: i32, user_id: i32) -> Result<bool> {
        self.search_repo().remove(search_id, user_id).await
    }

    pub async fn remove_all_searches_for_user(&self, user_id: i32) -> Result<u64> {
        self.search_repo().remove_all_for_user(user_id).await
    }

    // Delivery records

    pub async fn delivered_urls(&self, search_id: i32) -> Result<HashSet<String>> {
        self.delivery_repo().urls_for_search(search_id).await
    }

    /// Records every URL in one transaction; already-present pairs are ignored.
    pub async fn record_deliveries(&self, search_id: i32, urls: &[String]) -> Result<u64> {
        self.delivery_repo().record_all(search_id, urls).await
    }

    pub async fn delivery_count(&self, search_id: i32) -> Result<u64> {
        self.delivery_repo().count_for_search(search_id).await
    }

    pub async fn recent_deliveries(&self, search_id: i32, limit: u64) -> Result<Vec<DeliveryEntry>> {
        self.delivery_repo().recent(search_id, limit).await
    }
}
