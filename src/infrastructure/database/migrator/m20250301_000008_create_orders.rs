//! Create orders table

use sea_orm_migration::prelude::*;

use super::m20250301_000004_create_charging_sessions::ChargingSessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::SessionId).integer().not_null())
                    .col(ColumnDef::new(Orders::ChargePointId).string().not_null())
                    .col(ColumnDef::new(Orders::IdTag).string().not_null())
                    .col(ColumnDef::new(Orders::UserId).string())
                    .col(
                        ColumnDef::new(Orders::EnergyKwh)
                            .decimal_len(10, 3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::DurationMinutes)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::PricePerKwh)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::TotalAmount)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_session")
                            .from(Orders::Table, Orders::SessionId)
                            .to(ChargingSessions::Table, ChargingSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_charge_point")
                    .table(Orders::Table)
                    .col(Orders::ChargePointId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_session")
                    .table(Orders::Table)
                    .col(Orders::SessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Orders {
    Table,
    Id,
    SessionId,
    ChargePointId,
    IdTag,
    UserId,
    EnergyKwh,
    DurationMinutes,
    PricePerKwh,
    TotalAmount,
    Status,
    CreatedAt,
}
