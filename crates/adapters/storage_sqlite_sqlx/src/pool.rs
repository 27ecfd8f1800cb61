//! Opens the `SQLite` database backing the node tree and the audit log.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::StorageError;

/// Where the daemon keeps its data.
pub struct Config {
    /// Connection URL, `sqlite:safelabs.db?mode=rwc` for a file next to the
    /// daemon or `sqlite::memory:` for a throwaway database.
    pub database_url: String,
}

impl Config {
    /// Open the database, creating the file on first start, and bring the
    /// schema up to date with the embedded migrations.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::Database`] on a bad URL or connection
    /// failure and [`StorageError::Migration`] if the schema cannot be applied.
    pub async fn build(self) -> Result<Database, StorageError> {
        let options =
            SqliteConnectOptions::from_str(&self.database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Database { pool })
    }
}

/// An open, migrated database. Both stores share its pool.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
