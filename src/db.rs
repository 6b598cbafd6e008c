use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::DatabaseConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    info!(dsn = %cfg.redacted(), "connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(cfg.connect_options()?)
        .await
        .context("connect to database")?;
    Ok(pool)
}

/// Brings the users schema up to date.
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(db).await.context("run migrations")?;
    info!("migrations applied");
    Ok(())
}

/// Takes every table down and builds the schema again from scratch.
pub async fn refresh(db: &PgPool) -> anyhow::Result<()> {
    warn!("refreshing database schema, all users will be dropped");
    MIGRATOR.undo(db, 0).await.context("revert migrations")?;
    migrate(db).await
}
