use crate::infrastructure::config::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type DbPool = Pool<Postgres>;

/// How long a handler may wait for a free connection before the request
/// fails instead of queueing behind a saturated pool.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

/// Build the Postgres pool. Sizing comes from `DB_MAX_CONNECTIONS`; the
/// narration workload is bursty (a page view can fan out into story,
/// favorite and narration lookups at once) but short-lived per query.
pub async fn create_pool(config: &Config) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
}

/// Round-trip probe behind the readiness endpoint.
pub async fn check_connection(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
