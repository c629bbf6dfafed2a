//! Database pool and schema migrations.

use rocket_db_pools::sqlx::{self, PgPool, migrate::Migrator};
use rocket_db_pools::Database;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Database)]
#[database("roster_db")]
pub struct RosterDb(sqlx::PgPool);

/// Apply any pending migrations. Already-applied migrations are skipped after
/// their checksums are verified.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
