use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeliveryRecords::SearchId).integer().not_null())
                    .col(ColumnDef::new(DeliveryRecords::JobUrl).string().not_null())
                    .col(ColumnDef::new(DeliveryRecords::SentAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_records_search")
                            .from(DeliveryRecords::Table, DeliveryRecords::SearchId)
                            .to(SavedSearches::Table, SavedSearches::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_records_search_url")
                    .table(DeliveryRecords::Table)
                    .col(DeliveryRecords::SearchId)
                    .col(DeliveryRecords::JobUrl)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeliveryRecords {
    Table,
    Id,
    SearchId,
    JobUrl,
    SentAt,
}

#[derive(DeriveIden)]
enum SavedSearches {
    Table,
    Id,
}
