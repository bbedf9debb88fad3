use sea_orm::entity::prelude::*;

/// One posting URL already delivered for one saved search.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "delivery_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub search_id: i32,
    pub job_url: String,
    pub sent_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::saved_searches::Entity",
        from = "Column::SearchId",
        to = "super::saved_searches::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SavedSearches,
}

impl Related<super::saved_searches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavedSearches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
