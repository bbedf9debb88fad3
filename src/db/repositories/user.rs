use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::entities::{delivery_records, prelude::*, saved_searches, users};
use crate::models::user::User;

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            subscription_plan: model.subscription_plan,
            created_at: model.created_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, email: &str, name: &str, plan: &str) -> Result<i32> {
        let active_model = users::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.trim().to_lowercase()),
            subscription_plan: Set(plan.to_string()),
            created_at: Set(crate::db::format_timestamp(chrono::Utc::now())),
            ..Default::default()
        };

        let res = Users::insert(active_model)
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to insert user {email}"))?;

        Ok(res.last_insert_id)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Deletes the user with their saved searches and delivery records.
    pub async fn remove(&self, email: &str) -> Result<bool> {
        let Some(user) = Users::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.conn)
            .await?
        else {
            return Ok(false);
        };

        let txn = self.conn.begin().await?;

        let search_ids: Vec<i32> = SavedSearches::find()
            .select_only()
            .column(saved_searches::Column::Id)
            .filter(saved_searches::Column::UserId.eq(user.id))
            .into_tuple()
            .all(&txn)
            .await?;

        if !search_ids.is_empty() {
            DeliveryRecords::delete_many()
                .filter(delivery_records::Column::SearchId.is_in(search_ids))
                .exec(&txn)
                .await?;
        }

        SavedSearches::delete_many()
            .filter(saved_searches::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;

        let result = Users::delete_by_id(user.id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}
