//! Create devices table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::SerialNumber)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::TypeCode).string().not_null())
                    .col(
                        ColumnDef::new(Devices::MasterSecretEncrypted)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Devices::EncryptionAlgorithm)
                            .string()
                            .not_null()
                            .default("AES-256-GCM"),
                    )
                    .col(
                        ColumnDef::new(Devices::MqttClientId)
                            .string()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Devices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Devices::LastConnected).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_devices_type_code")
                    .table(Devices::Table)
                    .col(Devices::TypeCode)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Devices {
    Table,
    SerialNumber,
    TypeCode,
    MasterSecretEncrypted,
    EncryptionAlgorithm,
    MqttClientId,
    IsActive,
    LastConnected,
    CreatedAt,
}
