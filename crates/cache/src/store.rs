//! Self-healing access to one cache database.
//!
//! Both caches sit on top of a [`Store`]: every statement runs through
//! [`Store::run`], which serializes access behind one lock and rebuilds the
//! database from scratch when SQLite reports the file as corrupt.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Hit and miss counts plus the on-disk footprint of a cache.
#[derive(Debug, Clone, Copy, PartialEq, facet::Facet)]
pub struct CacheStats {
    pub entries: u64,
    pub bytes: u64,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
}

impl CacheStats {
    pub(crate) fn new(entries: u64, bytes: u64, hits: u64, misses: u64) -> Self {
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 };
        Self { entries, bytes, hits, misses, hit_rate }
    }
}

#[derive(Debug)]
pub(crate) struct Store {
    /// `None` for in-memory stores.
    path: Option<PathBuf>,
    migrator: &'static Migrator,
    db: Mutex<Database>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Store {
    /// Open the database at `path`. A corrupt file is deleted and recreated
    /// once before giving up.
    pub async fn open(path: impl AsRef<Path>, migrator: &'static Migrator) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        let db = match Database::connect(path, migrator).await {
            Err(err) if matches!(&*err, ErrorKind::Corrupt) => {
                tracing::warn!(path = %path.display(), "Cache database is corrupt, recreating");
                remove_files(path)?;
                Database::connect(path, migrator).await?
            },
            other => other?,
        };
        Ok(Self::with(Some(path.to_path_buf()), migrator, db))
    }

    pub async fn in_memory(migrator: &'static Migrator) -> Result<Self> {
        let db = Database::connect_in_memory(migrator).await?;
        Ok(Self::with(None, migrator, db))
    }

    fn with(path: Option<PathBuf>, migrator: &'static Migrator, db: Database) -> Self {
        Self {
            path,
            migrator,
            db: Mutex::new(db),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Run `op` against the pool while holding the store lock. If it fails
    /// because the database is corrupt, the database is rebuilt and the error
    /// is still returned; callers decide whether to retry.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut db = self.db.lock().await;
        let result = op(db.pool().clone()).await;
        if let Err(err) = &result
            && matches!(&**err, ErrorKind::Corrupt)
        {
            tracing::warn!(path = ?self.path, "Cache database is corrupt, recreating");
            *db = self.rebuild(&db).await?;
        }
        result
    }

    async fn rebuild(&self, old: &Database) -> Result<Database> {
        old.close().await;
        match &self.path {
            Some(path) => {
                remove_files(path)?;
                Database::connect(path, self.migrator).await
            },
            None => Database::connect_in_memory(self.migrator).await,
        }
    }

    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, hits: u64, misses: u64) {
        self.hits.fetch_add(hits, Ordering::Relaxed);
        self.misses.fetch_add(misses, Ordering::Relaxed);
    }

    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self, entries: u64) -> CacheStats {
        CacheStats::new(
            entries,
            self.bytes(),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Size of the database file plus its write-ahead log.
    fn bytes(&self) -> u64 {
        let Some(path) = &self.path else {
            return 0;
        };
        [path.clone(), sidecar(path, "-wal")]
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|meta| meta.len())
            .sum()
    }

    pub async fn close(&self) {
        self.db.lock().await.close().await;
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Delete the database file and its WAL/SHM sidecars.
fn remove_files(path: &Path) -> Result<()> {
    for file in [path.to_path_buf(), sidecar(path, "-wal"), sidecar(path, "-shm")] {
        match std::fs::remove_file(&file) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                return Err(err).or_raise(|| ErrorKind::Io);
            },
            _ => {},
        }
    }
    Ok(())
}

/// Current time as a unix timestamp, for `created_at` columns.
pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Unix timestamp `days` days before now.
pub(crate) fn cutoff(days: u32) -> i64 {
    (time::OffsetDateTime::now_utc() - time::Duration::days(i64::from(days))).unix_timestamp()
}
