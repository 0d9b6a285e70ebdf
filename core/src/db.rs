use std::{fs, fs::File, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
    path: PathBuf,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let path = Self::resolve_db_path(&config.database_path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory: {}", parent.display())
            })?;
        }

        if !path.exists() {
            File::create(&path)
                .with_context(|| format!("failed to create database file: {}", path.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to database: {}", path.display()))?;

        Ok(Self { pool, path })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to apply database migrations")
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.path
    }

    fn resolve_db_path(path: &str) -> Result<PathBuf> {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            Ok(path)
        } else {
            let cwd = std::env::current_dir().context("failed to resolve working directory")?;
            Ok(cwd.join(path))
        }
    }
}

pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
        if let sqlx::Error::Database(db_error) = sqlx_err {
            return db_error.message().contains("UNIQUE constraint failed");
        }
    }

    false
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub(crate) async fn connect_temp() -> (tempfile::TempDir, Database) {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let config = AppConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            ..AppConfig::default()
        };

        let database = Database::connect(&config).await.expect("connect database");
        database.migrate().await.expect("apply migrations");
        (temp_dir, database)
    }
}
