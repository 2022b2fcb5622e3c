//! OCR artifact cache: detections per image and translations per merged
//! region list.

use crate::db::{OCR_MIGRATOR, classify};
use crate::error::Result;
use crate::models::{decode_detections, decode_translations, encode_detections, encode_translations};
use crate::store::{CacheStats, Store, cutoff, now};
use std::path::Path;
use std::sync::Arc;
use verso_ocr::Detection;

/// Appended to the language and service columns. Bump it when detection or
/// merging changes what a stored row means; old rows then never match again
/// and age out through [`OcrArtifactStore::prune`].
const KEY_VERSION: &str = "v2";

fn versioned(value: &str) -> String {
    format!("{value}#{KEY_VERSION}")
}

/// Hash of raw image bytes, used as the first key column.
pub fn image_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Identifies one detection pass over one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionKey {
    pub image_hash: String,
    pub source_lang: String,
    pub media_type: String,
    pub threshold: f32,
}

impl RegionKey {
    pub fn new(image: &[u8], source_lang: &str, media_type: &str, threshold: f32) -> Self {
        Self {
            image_hash: image_hash(image),
            source_lang: source_lang.to_string(),
            media_type: media_type.to_string(),
            threshold,
        }
    }

    /// The threshold is stored as integer thousandths so that float noise
    /// never splits a key.
    fn threshold_milli(&self) -> i64 {
        (f64::from(self.threshold) * 1000.0).round() as i64
    }
}

#[derive(Debug, Clone)]
pub struct OcrArtifactStore {
    store: Arc<Store>,
}

impl OcrArtifactStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Store::open(path, &OCR_MIGRATOR).await?;
        Ok(Self { store: Arc::new(store) })
    }

    pub async fn in_memory() -> Result<Self> {
        let store = Store::in_memory(&OCR_MIGRATOR).await?;
        Ok(Self { store: Arc::new(store) })
    }

    /// Cached detections for `key`. Unreadable rows count as misses.
    pub async fn get_regions(&self, key: &RegionKey) -> Option<Vec<Detection>> {
        let result = self
            .store
            .run(|pool| async move {
                let row = classify(
                    sqlx::query_scalar::<_, String>(include_str!("../queries/ocr/get_regions.sql"))
                        .bind(key.image_hash.as_str())
                        .bind(versioned(&key.source_lang))
                        .bind(key.media_type.as_str())
                        .bind(key.threshold_milli())
                        .fetch_optional(&pool)
                        .await,
                )?;
                row.map(|json| decode_detections(&json)).transpose()
            })
            .await;
        self.settle(result, "regions")
    }

    pub async fn put_regions(&self, key: &RegionKey, detections: &[Detection]) {
        let json = match encode_detections(detections) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not encode detections");
                return;
            },
        };
        self.write("regions", |pool| {
            let json = json.clone();
            async move {
                classify(
                    sqlx::query(include_str!("../queries/ocr/upsert_regions.sql"))
                        .bind(key.image_hash.as_str())
                        .bind(versioned(&key.source_lang))
                        .bind(key.media_type.as_str())
                        .bind(key.threshold_milli())
                        .bind(json)
                        .bind(now())
                        .execute(&pool)
                        .await,
                )?;
                Ok(())
            }
        })
        .await;
    }

    /// Cached translations for the merged regions of `key`, aligned to the
    /// region order that produced `regions_hash`.
    pub async fn get_translations(
        &self,
        key: &RegionKey,
        target_lang: &str,
        service: &str,
        regions_hash: &str,
    ) -> Option<Vec<String>> {
        let result = self
            .store
            .run(|pool| async move {
                let row = classify(
                    sqlx::query_scalar::<_, String>(include_str!("../queries/ocr/get_translations.sql"))
                        .bind(key.image_hash.as_str())
                        .bind(versioned(&key.source_lang))
                        .bind(key.media_type.as_str())
                        .bind(key.threshold_milli())
                        .bind(versioned(target_lang))
                        .bind(versioned(service))
                        .bind(regions_hash)
                        .fetch_optional(&pool)
                        .await,
                )?;
                row.map(|json| decode_translations(&json)).transpose()
            })
            .await;
        self.settle(result, "translations")
    }

    pub async fn put_translations(
        &self,
        key: &RegionKey,
        target_lang: &str,
        service: &str,
        regions_hash: &str,
        translations: &[String],
    ) {
        let json = match encode_translations(translations) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not encode region translations");
                return;
            },
        };
        self.write("translations", |pool| {
            let json = json.clone();
            async move {
                classify(
                    sqlx::query(include_str!("../queries/ocr/upsert_translations.sql"))
                        .bind(key.image_hash.as_str())
                        .bind(versioned(&key.source_lang))
                        .bind(key.media_type.as_str())
                        .bind(key.threshold_milli())
                        .bind(versioned(target_lang))
                        .bind(versioned(service))
                        .bind(regions_hash)
                        .bind(json)
                        .bind(now())
                        .execute(&pool)
                        .await,
                )?;
                Ok(())
            }
        })
        .await;
    }

    fn settle<T>(&self, result: Result<Option<T>>, table: &str) -> Option<T> {
        match result {
            Ok(Some(value)) => {
                self.store.hit();
                tracing::debug!(table, "OCR cache hit");
                Some(value)
            },
            Ok(None) => {
                self.store.miss();
                None
            },
            Err(err) => {
                tracing::debug!(table, error = ?err, "OCR cache lookup failed, treating as miss");
                self.store.miss();
                None
            },
        }
    }

    /// One attempt, one retry against the (possibly rebuilt) store, then drop.
    async fn write<F, Fut>(&self, table: &str, op: F)
    where
        F: Fn(sqlx::SqlitePool) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        for attempt in 1..=2 {
            match self.store.run(&op).await {
                Ok(()) => return,
                Err(err) if attempt == 1 => tracing::debug!(table, error = ?err, "OCR cache write failed, retrying"),
                Err(err) => tracing::warn!(table, error = ?err, "OCR cache write failed, dropping entry"),
            }
        }
    }

    /// Empty both tables and reset the hit/miss counters.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .run(|pool| async move {
                let mut tx = classify(pool.begin().await)?;
                classify(sqlx::query("DELETE FROM ocr_regions").execute(&mut *tx).await)?;
                classify(sqlx::query("DELETE FROM ocr_translations").execute(&mut *tx).await)?;
                classify(tx.commit().await)
            })
            .await?;
        self.store.reset_counters();
        Ok(())
    }

    /// Delete rows from both tables written more than `days` days ago.
    pub async fn prune(&self, days: u32) -> Result<u64> {
        let pruned = self
            .store
            .run(|pool| async move {
                let before = cutoff(days);
                let mut tx = classify(pool.begin().await)?;
                let regions = classify(
                    sqlx::query("DELETE FROM ocr_regions WHERE created_at < ?")
                        .bind(before)
                        .execute(&mut *tx)
                        .await,
                )?;
                let translations = classify(
                    sqlx::query("DELETE FROM ocr_translations WHERE created_at < ?")
                        .bind(before)
                        .execute(&mut *tx)
                        .await,
                )?;
                classify(tx.commit().await)?;
                Ok(regions.rows_affected() + translations.rows_affected())
            })
            .await?;
        tracing::info!(pruned, days, "Pruned OCR cache");
        Ok(pruned)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let (regions, translations) = self
            .store
            .run(|pool| async move {
                classify(
                    sqlx::query_as::<_, (i64, i64)>(include_str!("../queries/ocr/count.sql"))
                        .fetch_one(&pool)
                        .await,
                )
            })
            .await?;
        let entries = u64::try_from(regions + translations).unwrap_or_default();
        Ok(self.store.stats(entries))
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}
