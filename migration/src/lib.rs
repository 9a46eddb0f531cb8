pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_movie;
mod m20250301_000002_create_reservation;
mod m20250312_000001_add_reservation_status_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_movie::Migration),
            Box::new(m20250301_000002_create_reservation::Migration),
            Box::new(m20250312_000001_add_reservation_status_index::Migration),
        ]
    }
}
