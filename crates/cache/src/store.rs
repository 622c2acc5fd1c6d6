//! Result store: one per rule instance, keyed by URL (or composite key).

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Outcome, Record, ResultRow};
use exn::ResultExt;
use std::path::Path;
use std::time::Duration;
use time::UtcDateTime;
use tracing::instrument;

/// Retention windows for cached outcomes.
///
/// Failures are more likely to be transient (or fixed soon) than successes,
/// so negative outcomes normally get the shorter window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub positive: Duration,
    pub negative: Duration,
}
impl Expiry {
    pub fn from_secs(positive: u64, negative: u64) -> Self {
        Self { positive: Duration::from_secs(positive), negative: Duration::from_secs(negative) }
    }

    fn window(&self, positive: bool) -> i64 {
        let window = if positive { self.positive } else { self.negative };
        i64::try_from(window.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Persistent key → [`Outcome`] store with age-based eviction.
///
/// Expired rows are evicted once, when the store is opened; a row that
/// expires while the run is in progress is still served. At most one record
/// exists per key, and writes replace (never merge with) what was there.
#[derive(Debug, Clone)]
pub struct ResultCache {
    db: Database,
    expiry: Expiry,
}

impl ResultCache {
    /// Open (or create) the store at `path`, creating parent directories as
    /// needed, then evict everything that has expired as of now.
    pub async fn open(path: impl AsRef<Path>, expiry: Expiry) -> Result<Self> {
        Self::open_at(path, expiry, UtcDateTime::now()).await
    }

    /// Same as [`open`](Self::open), but evicts relative to the given time.
    #[instrument(skip(path, expiry), fields(path = %path.as_ref().display()))]
    pub async fn open_at(path: impl AsRef<Path>, expiry: Expiry, now: UtcDateTime) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Directory(parent.to_path_buf()))?;
        }
        let cache = Self { db: Database::connect(path).await?, expiry };
        let evicted = cache.evict_expired(now).await?;
        tracing::info!(path = %path.display(), evicted, "Opened result cache");
        Ok(cache)
    }

    /// An empty, throwaway store (useful for testing).
    pub async fn in_memory(expiry: Expiry) -> Result<Self> {
        Ok(Self { db: Database::connect_in_memory().await?, expiry })
    }

    /// Delete every row whose age has reached its retention window.
    ///
    /// A row written at `T` with window `W` is gone for any `now >= T + W`.
    /// Returns the number of rows deleted.
    pub async fn evict_expired(&self, now: UtcDateTime) -> Result<u64> {
        let mut evicted = 0;
        for positive in [true, false] {
            let cutoff = now.unix_timestamp().saturating_sub(self.expiry.window(positive));
            let result = sqlx::query(include_str!("../queries/evict_results.sql"))
                .bind(positive)
                .bind(cutoff)
                .execute(self.db.pool())
                .await
                .or_raise(|| ErrorKind::Database)?;
            evicted += result.rows_affected();
        }
        Ok(evicted)
    }

    /// Look up the record stored for `key`.
    pub async fn get(&self, key: &str) -> Result<Option<Record>> {
        let row: Option<ResultRow> = sqlx::query_as(include_str!("../queries/get_result.sql"))
            .bind(key)
            .fetch_optional(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Record::try_from).transpose()
    }

    /// Store `outcome` for `key`, stamped with the current time.
    pub async fn put(&self, key: &str, outcome: Outcome) -> Result<()> {
        self.upsert(&Record::new(key, outcome)).await
    }

    /// Insert or replace a record, keeping its own timestamp.
    pub async fn upsert(&self, record: &Record) -> Result<()> {
        let row = ResultRow::from(record);
        sqlx::query(include_str!("../queries/upsert_result.sql"))
            .bind(row.key)
            .bind(row.kind)
            .bind(row.positive)
            .bind(row.status)
            .bind(row.redirect_to)
            .bind(row.flag)
            .bind(row.time)
            .execute(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
