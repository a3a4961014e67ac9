use sea_orm_migration::prelude::*;

mod m20260301000000_baseline;
mod m20260315000000_pending_invoices;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301000000_baseline::Migration),
            Box::new(m20260315000000_pending_invoices::Migration),
        ]
    }
}
