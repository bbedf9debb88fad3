use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "saved_searches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub keyword: String,
    pub country: String,
    pub location: Option<String>,
    pub language: Option<String>,
    #[sea_orm(default_value = "hourly")]
    pub frequency: String,
    pub hours_old: Option<i32>,
    pub exclude: Option<String>,
    pub results_wanted: Option<i32>,
    /// RFC 3339 UTC, NULL until the first run.
    pub last_run: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::delivery_records::Entity")]
    DeliveryRecords,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::delivery_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
