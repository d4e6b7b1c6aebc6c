use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use crate::config::Config;

pub async fn init_db(config: &Config) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    info!(max_connections = config.db_max_connections, "connected to MySQL");
    Ok(pool)
}
