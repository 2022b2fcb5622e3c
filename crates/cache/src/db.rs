//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Migrations for the text translation cache.
pub(crate) static CONTENT_MIGRATOR: Migrator = sqlx::migrate!("./migrations/content");
/// Migrations for the OCR artifact cache.
pub(crate) static OCR_MIGRATOR: Migrator = sqlx::migrate!("./migrations/ocr");

// Cache calls are short; a handful of readers alongside the single WAL writer.
const MAX_CONNECTIONS: u32 = 5;

// SQLITE_CORRUPT and SQLITE_NOTADB (primary result codes).
const SQLITE_CORRUPT: i32 = 11;
const SQLITE_NOTADB: i32 = 26;

/// Connection pool for one cache database file.
#[derive(Debug, Clone)]
pub(crate) struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>, migrator: &'static Migrator) -> Result<Self> {
        // The query-based PRAGMAs must be applied to EVERY connection the pool
        // opens, not only the first one.
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await;
        let db = Self { pool: classify(pool)? };
        db.migrate(migrator).await?;
        Ok(db)
    }

    /// Connect to the database at `path`, creating it if it doesn't exist,
    /// and run `migrator`.
    pub async fn connect(path: impl AsRef<Path>, migrator: &'static Migrator) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None, migrator).await
    }

    /// Connect to a private in-memory database.
    ///
    /// In-memory databases are destroyed when the connection closes. Not gated
    /// behind `#[cfg(test)]` so that other crates can use it in their tests.
    pub async fn connect_in_memory(migrator: &'static Migrator) -> Result<Self> {
        // Parallel connections to ":memory:" would each see a different
        // database, so the pool is limited to one.
        let options = Self::base_options().filename(":memory:");
        Self::new(options, Some(1), migrator).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL keeps committed rows intact when a write is interrupted.
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            // Prescan and chapter workers write concurrently.
            .busy_timeout(std::time::Duration::from_millis(1500))
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    /// Apply PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
                PRAGMA mmap_size = 33554432;
                PRAGMA analysis_limit = 1000;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing cache migrations", skip(migrator))]
    async fn migrate(&self, migrator: &'static Migrator) -> Result<()> {
        let result = migrator.run(&self.pool).await;
        let corrupt = matches!(&result, Err(err) if is_corruption(err));
        result.or_raise(|| if corrupt { ErrorKind::Corrupt } else { ErrorKind::Migration })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool after letting SQLite refresh its planner statistics.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

/// Raise a sqlx error as [`ErrorKind::Corrupt`] when SQLite reports a damaged
/// or foreign file, and as [`ErrorKind::Database`] otherwise.
pub(crate) fn classify<T>(result: sqlx::Result<T>) -> Result<T> {
    let corrupt = matches!(&result, Err(err) if is_corruption(err));
    result.or_raise(|| if corrupt { ErrorKind::Corrupt } else { ErrorKind::Database })
}

/// Walk the source chain looking for a SQLite corruption result code or the
/// messages SQLite attaches to one.
pub(crate) fn is_corruption(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(sqlx::Error::Database(db)) = err.downcast_ref::<sqlx::Error>() {
            let code = db.code().and_then(|code| code.parse::<i32>().ok());
            if code.is_some_and(|code| matches!(code & 0xff, SQLITE_CORRUPT | SQLITE_NOTADB)) {
                return true;
            }
        }
        let message = err.to_string().to_lowercase();
        if message.contains("malformed") || message.contains("not a database") {
            return true;
        }
        current = err.source();
    }
    false
}
