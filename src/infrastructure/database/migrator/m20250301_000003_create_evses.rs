//! Create evses table

use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_charge_points::ChargePoints;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Evses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Evses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Evses::ChargePointId).string().not_null())
                    .col(ColumnDef::new(Evses::ConnectorId).integer().not_null())
                    .col(
                        ColumnDef::new(Evses::ConnectorType)
                            .string()
                            .not_null()
                            .default("Type2"),
                    )
                    .col(
                        ColumnDef::new(Evses::Status)
                            .string()
                            .not_null()
                            .default("Unavailable"),
                    )
                    .col(ColumnDef::new(Evses::LastErrorCode).string())
                    .col(
                        ColumnDef::new(Evses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_evses_charge_point")
                            .from(Evses::Table, Evses::ChargePointId)
                            .to(ChargePoints::Table, ChargePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per physical outlet
        manager
            .create_index(
                Index::create()
                    .name("idx_evses_charge_point_connector")
                    .table(Evses::Table)
                    .col(Evses::ChargePointId)
                    .col(Evses::ConnectorId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Evses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Evses {
    Table,
    Id,
    ChargePointId,
    ConnectorId,
    ConnectorType,
    Status,
    LastErrorCode,
    UpdatedAt,
}
