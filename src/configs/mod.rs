use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{api::error, ENV};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(ENV.db_max_connections)
        .min_connections(ENV.db_min_connections)
        .acquire_slow_threshold(ENV.db_acquire_slow_threshold)
        .connect(database_url)
        .await?;
    log::info!("Connected to database");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), error::SystemError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations applied");
    Ok(())
}
