use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the dedup store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The fingerprint is already recorded; this insert lost to an earlier
    /// writer. Under concurrent workers the primary key is the enforcement
    /// point for at-most-one-record-per-fingerprint.
    #[error("fingerprint already recorded")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable record of completed uploads, keyed by content fingerprint.
///
/// A row exists only after both remote phases (byte upload and item
/// registration) have succeeded. Rows are never updated or deleted here.
#[derive(Clone)]
pub struct UploadStore {
    pool: Pool<Sqlite>,
}

impl UploadStore {
    /// Open (creating if missing) the upload database at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            // WAL allows concurrent worker reads alongside the insert path
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Opened upload database at {:?}", path);
        Ok(store)
    }

    /// In-memory store for tests. Single connection: each pooled connection
    /// would otherwise get its own private database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the uploads table if absent. The schema is fixed and never
    /// migrated.
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS uploads \
             (fingerprint TEXT PRIMARY KEY, filename TEXT, uploaded INTEGER)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Point lookup: has this fingerprint already been uploaded? No side
    /// effects.
    pub async fn exists(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM uploads WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Record a completed upload. Fails with [`StoreError::Duplicate`] if a
    /// concurrent worker recorded the same fingerprint first.
    pub async fn record(
        &self,
        fingerprint: &str,
        filename: &str,
        uploaded_at: i64,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("INSERT INTO uploads (fingerprint, filename, uploaded) VALUES (?, ?, ?)")
                .bind(fingerprint)
                .bind(filename)
                .bind(uploaded_at)
                .execute(&self.pool)
                .await;

        match result {
            Ok(_) => {
                debug!(fingerprint, filename, "Recorded upload");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if matches!(db.kind(), ErrorKind::UniqueViolation) => {
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Total number of recorded uploads.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM uploads")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
