//! Create charge_points table

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_devices::Devices;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargePoints::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargePoints::DeviceSerial).string())
                    .col(ColumnDef::new(ChargePoints::Vendor).string())
                    .col(ColumnDef::new(ChargePoints::Model).string())
                    .col(ColumnDef::new(ChargePoints::FirmwareVersion).string())
                    .col(
                        ColumnDef::new(ChargePoints::PhysicalStatus)
                            .string()
                            .not_null()
                            .default("Unavailable"),
                    )
                    .col(
                        ColumnDef::new(ChargePoints::OperationalStatus)
                            .string()
                            .not_null()
                            .default("ENABLED"),
                    )
                    .col(ColumnDef::new(ChargePoints::LastSeen).timestamp_with_time_zone())
                    .col(ColumnDef::new(ChargePoints::Latitude).double())
                    .col(ColumnDef::new(ChargePoints::Longitude).double())
                    .col(ColumnDef::new(ChargePoints::Address).string())
                    .col(ColumnDef::new(ChargePoints::PricePerKwh).decimal_len(10, 2))
                    .col(ColumnDef::new(ChargePoints::ChargingRateKw).double())
                    .col(
                        ColumnDef::new(ChargePoints::RegisteredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charge_points_device")
                            .from(ChargePoints::Table, ChargePoints::DeviceSerial)
                            .to(Devices::Table, Devices::SerialNumber)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charge_points_device")
                    .table(ChargePoints::Table)
                    .col(ChargePoints::DeviceSerial)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargePoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargePoints {
    Table,
    Id,
    DeviceSerial,
    Vendor,
    Model,
    FirmwareVersion,
    PhysicalStatus,
    OperationalStatus,
    LastSeen,
    Latitude,
    Longitude,
    Address,
    PricePerKwh,
    ChargingRateKw,
    RegisteredAt,
}
