pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_products_table;
mod m20250601_000002_create_invoices_table;
mod m20250601_000003_create_invoice_items_table;
mod m20250601_000004_create_invoice_sequences_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_products_table::Migration),
            Box::new(m20250601_000002_create_invoices_table::Migration),
            Box::new(m20250601_000003_create_invoice_items_table::Migration),
            Box::new(m20250601_000004_create_invoice_sequences_table::Migration),
        ]
    }
}
