use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager and the services built on it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Could not connect to database: {0}")]
    Connect(String),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

/// Postgres SQLSTATE codes we translate into conflicts.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let target = db_err.constraint().unwrap_or("unique constraint");
                    return DatabaseError::Conflict(format!("Duplicate data violates {}", target));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    let target = db_err.constraint().unwrap_or("foreign key");
                    return DatabaseError::Conflict(format!(
                        "Data is referenced by or references missing rows ({})",
                        target
                    ));
                }
                _ => {}
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Process-wide holder of the application connection pool
pub struct DatabaseManager {
    pool: OnceCell<PgPool>,
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager {
            pool: OnceCell::new(),
        })
    }

    /// Get the application pool, creating it on first use.
    ///
    /// A failed connection attempt is not cached, so the next caller retries.
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        Self::instance()
            .pool
            .get_or_try_init(Self::connect)
            .await
            .cloned()
    }

    async fn connect() -> Result<PgPool, DatabaseError> {
        let settings = &config::config().database;
        let url = settings
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL or DB_HOST/DB_NAME"))?;

        let mut options = PgConnectOptions::from_str(url)
            .map_err(|e| DatabaseError::Connect(e.to_string()))?;
        if !settings.enable_query_logging {
            options = options.disable_statement_logging();
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connect(e.to_string()))?;

        info!("Created database pool ({} max connections)", settings.max_connections);
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Apply the embedded migrations in `migrations/`
    pub async fn migrate() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        MIGRATOR.run(&pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close() {
        if let Some(pool) = Self::instance().pool.get() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sqlx_errors_stay_sqlx() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DatabaseError::Sqlx(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn migrations_are_embedded() {
        assert!(MIGRATOR.iter().count() >= 1);
    }
}
