pub mod migrations;
pub mod repositories;
pub mod sqlite;

pub use repositories::*;
pub use sqlite::{create_memory_pool, create_sqlite_pool, health_check, SqlitePool};

use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chemdocs.db".to_string(),
            max_connections: 5,
            connection_timeout: Duration::from_secs(30),
        }
    }
}

pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = create_sqlite_pool(&config.url, config.max_connections, config.connection_timeout).await?;

    migrations::run_migrations(&pool).await?;

    Ok(pool)
}
