//! Create charging_sessions table

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
                    .table(ChargingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::ChargePointId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EvseId).integer().not_null())
                    .col(
                        ColumnDef::new(ChargingSessions::TransactionId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::IdTag).string().not_null())
                    .col(ColumnDef::new(ChargingSessions::UserId).string())
                    .col(
                        ColumnDef::new(ChargingSessions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EndTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChargingSessions::MeterStart)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ChargingSessions::MeterStop).integer())
                    .col(
                        ColumnDef::new(ChargingSessions::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(ChargingSessions::StopReason).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_charge_point")
                            .from(ChargingSessions::Table, ChargingSessions::ChargePointId)
                            .to(ChargePoints::Table, ChargePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_transaction_unique")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::ChargePointId)
                    .col(ChargingSessions::EvseId)
                    .col(ChargingSessions::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Serves the one-active-per-connector check and dashboard listings
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_charge_point_status")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::ChargePointId)
                    .col(ChargingSessions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_start_time")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::StartTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingSessions {
    Table,
    Id,
    ChargePointId,
    EvseId,
    TransactionId,
    IdTag,
    UserId,
    StartTime,
    EndTime,
    MeterStart,
    MeterStop,
    Status,
    StopReason,
}
