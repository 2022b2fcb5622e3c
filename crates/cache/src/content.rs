//! Text translation cache.

use crate::db::{CONTENT_MIGRATOR, classify};
use crate::error::Result;
use crate::store::{CacheStats, Store, cutoff, now};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Content-addressed cache of translated text segments.
///
/// Rows are keyed by `(blake3(text), source_lang, target_lang, service)`.
/// Lookups never fail: a broken database is recreated and the lookup is
/// reported as a miss. Writes are retried once and then dropped.
#[derive(Debug, Clone)]
pub struct ContentCache {
    store: Arc<Store>,
}

/// The hash half of a cache key.
pub fn text_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

impl ContentCache {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Store::open(path, &CONTENT_MIGRATOR).await?;
        Ok(Self { store: Arc::new(store) })
    }

    pub async fn in_memory() -> Result<Self> {
        let store = Store::in_memory(&CONTENT_MIGRATOR).await?;
        Ok(Self { store: Arc::new(store) })
    }

    pub async fn get(&self, text: &str, source_lang: &str, target_lang: &str, service: &str) -> Option<String> {
        let hash = text_hash(text);
        let result = self
            .store
            .run(|pool| async move {
                classify(
                    sqlx::query_scalar::<_, String>(include_str!("../queries/content/get.sql"))
                        .bind(hash.as_str())
                        .bind(source_lang)
                        .bind(target_lang)
                        .bind(service)
                        .fetch_optional(&pool)
                        .await,
                )
            })
            .await;
        match result {
            Ok(Some(translation)) => {
                self.store.hit();
                Some(translation)
            },
            Ok(None) => {
                self.store.miss();
                None
            },
            Err(err) => {
                tracing::debug!(error = ?err, "Cache lookup failed, treating as miss");
                self.store.miss();
                None
            },
        }
    }

    pub async fn put(&self, text: &str, translation: &str, source_lang: &str, target_lang: &str, service: &str) {
        let pairs = [(text, translation)];
        self.put_batch(&pairs, source_lang, target_lang, service).await;
    }

    /// Look up every text, returning the cached translations by input index.
    /// Duplicate texts are fetched once and each occurrence counts as a hit.
    #[instrument(skip_all, fields(count = texts.len()))]
    pub async fn get_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        source_lang: &str,
        target_lang: &str,
        service: &str,
    ) -> HashMap<usize, String> {
        let mut indices: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, text) in texts.iter().enumerate() {
            indices.entry(text_hash(text.as_ref())).or_default().push(index);
        }
        let result = self
            .store
            .run(|pool| async move {
                let mut found = HashMap::new();
                for (hash, positions) in indices {
                    let row = classify(
                        sqlx::query_scalar::<_, String>(include_str!("../queries/content/get.sql"))
                            .bind(hash.as_str())
                            .bind(source_lang)
                            .bind(target_lang)
                            .bind(service)
                            .fetch_optional(&pool)
                            .await,
                    )?;
                    if let Some(translation) = row {
                        found.extend(positions.into_iter().map(|index| (index, translation.clone())));
                    }
                }
                Ok(found)
            })
            .await;
        let found = result.unwrap_or_else(|err| {
            tracing::debug!(error = ?err, "Cache batch lookup failed, treating as misses");
            HashMap::new()
        });
        let hits = found.len() as u64;
        self.store.record(hits, texts.len() as u64 - hits);
        found
    }

    /// Upsert `(text, translation)` pairs in one transaction.
    #[instrument(skip_all, fields(count = pairs.len()))]
    pub async fn put_batch<S: AsRef<str>, T: AsRef<str>>(
        &self,
        pairs: &[(S, T)],
        source_lang: &str,
        target_lang: &str,
        service: &str,
    ) {
        if pairs.is_empty() {
            return;
        }
        for attempt in 1..=2 {
            let result = self
                .store
                .run(|pool| async move {
                    let timestamp = now();
                    let mut tx = classify(pool.begin().await)?;
                    for (text, translation) in pairs {
                        let text = text.as_ref();
                        classify(
                            sqlx::query(include_str!("../queries/content/upsert.sql"))
                                .bind(text_hash(text))
                                .bind(source_lang)
                                .bind(target_lang)
                                .bind(service)
                                .bind(text)
                                .bind(translation.as_ref())
                                .bind(timestamp)
                                .execute(&mut *tx)
                                .await,
                        )?;
                    }
                    classify(tx.commit().await)
                })
                .await;
            match result {
                Ok(()) => return,
                Err(err) if attempt == 1 => tracing::debug!(error = ?err, "Cache write failed, retrying"),
                Err(err) => tracing::warn!(error = ?err, "Cache write failed, dropping entries"),
            }
        }
    }

    /// Delete every entry and reset the hit/miss counters.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .run(|pool| async move {
                classify(sqlx::query(include_str!("../queries/content/clear.sql")).execute(&pool).await)
            })
            .await?;
        self.store.reset_counters();
        Ok(())
    }

    /// Delete entries written more than `days` days ago, returning how many.
    pub async fn prune(&self, days: u32) -> Result<u64> {
        let result = self
            .store
            .run(|pool| async move {
                classify(
                    sqlx::query(include_str!("../queries/content/prune.sql"))
                        .bind(cutoff(days))
                        .execute(&pool)
                        .await,
                )
            })
            .await?;
        let pruned = result.rows_affected();
        tracing::info!(pruned, days, "Pruned translation cache");
        Ok(pruned)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self
            .store
            .run(|pool| async move {
                classify(
                    sqlx::query_scalar::<_, i64>(include_str!("../queries/content/count.sql"))
                        .fetch_one(&pool)
                        .await,
                )
            })
            .await?;
        Ok(self.store.stats(u64::try_from(entries).unwrap_or_default()))
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}
