//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_devices;
mod m20250301_000002_create_charge_points;
mod m20250301_000003_create_evses;
mod m20250301_000004_create_charging_sessions;
mod m20250301_000005_create_meter_values;
mod m20250301_000006_create_device_events;
mod m20250301_000007_create_id_tags;
mod m20250301_000008_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_devices::Migration),
            Box::new(m20250301_000002_create_charge_points::Migration),
            Box::new(m20250301_000003_create_evses::Migration),
            Box::new(m20250301_000004_create_charging_sessions::Migration),
            Box::new(m20250301_000005_create_meter_values::Migration),
            Box::new(m20250301_000006_create_device_events::Migration),
            Box::new(m20250301_000007_create_id_tags::Migration),
            Box::new(m20250301_000008_create_orders::Migration),
        ]
    }
}
