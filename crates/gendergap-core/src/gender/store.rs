use std::collections::HashMap;

use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tokio::sync::RwLock;

use super::{Gender, GenderResult};

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS gender_cache (
    layer TEXT NOT NULL,
    name TEXT NOT NULL,
    gender TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (layer, name)
);
";

/// Cache layers, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLayer {
    /// Hand-curated corrections.
    Manual,
    /// External API answers keyed by full name.
    ApiFullName,
    /// External API answers keyed by first name.
    ApiFirstName,
    /// First names resolved by any means.
    FirstName,
}

impl CacheLayer {
    pub const ALL: [Self; 4] = [Self::Manual, Self::ApiFullName, Self::ApiFirstName, Self::FirstName];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::ApiFullName => "api_full_name",
            Self::ApiFirstName => "api_first_name",
            Self::FirstName => "first_name",
        }
    }

    /// Whether the layer is keyed by first name rather than full name.
    #[must_use]
    pub const fn by_first_name(&self) -> bool {
        matches!(self, Self::ApiFirstName | Self::FirstName)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// An `unknown` entry became female or male.
    Promoted,
    Unchanged,
    /// A resolved entry disagreed with the new value and was kept.
    Conflict { kept: Gender },
}

/// The write rule shared by every store: new names are inserted, `unknown`
/// may be promoted, a resolved gender is never overwritten.
fn merge(existing: Option<Gender>, new: Gender) -> (Gender, UpsertOutcome) {
    match existing {
        None => (new, UpsertOutcome::Inserted),
        Some(old) if old == new => (old, UpsertOutcome::Unchanged),
        Some(Gender::Unknown) => (new, UpsertOutcome::Promoted),
        Some(old) if new == Gender::Unknown => (old, UpsertOutcome::Unchanged),
        Some(old) => (old, UpsertOutcome::Conflict { kept: old }),
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[async_trait::async_trait]
pub trait GenderStore: Send + Sync {
    async fn get(&self, layer: CacheLayer, name: &str) -> GenderResult<Option<Gender>>;

    async fn upsert(
        &self,
        layer: CacheLayer,
        name: &str,
        gender: Gender,
    ) -> GenderResult<UpsertOutcome>;
}

pub struct SqliteGenderStore {
    pool: Pool<Sqlite>,
}

impl SqliteGenderStore {
    /// Open (and create) the cache at a sqlx URL such as
    /// `sqlite:gender_cache.db?mode=rwc`.
    pub async fn open(url: &str) -> GenderResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        sqlx::query(INIT_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn open_memory() -> GenderResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::query(INIT_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl GenderStore for SqliteGenderStore {
    async fn get(&self, layer: CacheLayer, name: &str) -> GenderResult<Option<Gender>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT gender FROM gender_cache WHERE layer = ? AND name = ?")
                .bind(layer.as_str())
                .bind(key(name))
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(g,)| g.parse()).transpose()
    }

    async fn upsert(
        &self,
        layer: CacheLayer,
        name: &str,
        gender: Gender,
    ) -> GenderResult<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT gender FROM gender_cache WHERE layer = ? AND name = ?")
                .bind(layer.as_str())
                .bind(key(name))
                .fetch_optional(&mut *tx)
                .await?;
        let existing = existing.map(|(g,)| g.parse()).transpose()?;
        let (value, outcome) = merge(existing, gender);

        if matches!(outcome, UpsertOutcome::Inserted | UpsertOutcome::Promoted) {
            sqlx::query(
                r"
                INSERT INTO gender_cache (layer, name, gender, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (layer, name) DO UPDATE
                SET gender = excluded.gender, updated_at = excluded.updated_at
                ",
            )
            .bind(layer.as_str())
            .bind(key(name))
            .bind(value.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(outcome)
    }
}

/// In-process cache for tests and single-run tools.
#[derive(Default)]
pub struct MemoryGenderStore {
    entries: RwLock<HashMap<(CacheLayer, String), Gender>>,
}

impl MemoryGenderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GenderStore for MemoryGenderStore {
    async fn get(&self, layer: CacheLayer, name: &str) -> GenderResult<Option<Gender>> {
        Ok(self.entries.read().await.get(&(layer, key(name))).copied())
    }

    async fn upsert(
        &self,
        layer: CacheLayer,
        name: &str,
        gender: Gender,
    ) -> GenderResult<UpsertOutcome> {
        let mut entries = self.entries.write().await;
        let slot = (layer, key(name));
        let (value, outcome) = merge(entries.get(&slot).copied(), gender);
        entries.insert(slot, value);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_never_downgrades() {
        assert_eq!(merge(None, Gender::Unknown).1, UpsertOutcome::Inserted);
        assert_eq!(
            merge(Some(Gender::Unknown), Gender::Female),
            (Gender::Female, UpsertOutcome::Promoted)
        );
        assert_eq!(
            merge(Some(Gender::Male), Gender::Unknown),
            (Gender::Male, UpsertOutcome::Unchanged)
        );
        assert_eq!(
            merge(Some(Gender::Male), Gender::Female),
            (Gender::Male, UpsertOutcome::Conflict { kept: Gender::Male })
        );
    }

    #[tokio::test]
    async fn test_sqlite_store_upsert() {
        let store = SqliteGenderStore::open_memory().await.unwrap();
        assert_eq!(store.get(CacheLayer::FirstName, "marie").await.unwrap(), None);

        store
            .upsert(CacheLayer::FirstName, "Marie", Gender::Unknown)
            .await
            .unwrap();
        let outcome = store
            .upsert(CacheLayer::FirstName, "marie", Gender::Female)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Promoted);

        store
            .upsert(CacheLayer::FirstName, "marie", Gender::Unknown)
            .await
            .unwrap();
        assert_eq!(
            store.get(CacheLayer::FirstName, "MARIE").await.unwrap(),
            Some(Gender::Female)
        );
        assert_eq!(store.get(CacheLayer::Manual, "marie").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_layers_are_separate() {
        let store = MemoryGenderStore::new();
        store
            .upsert(CacheLayer::Manual, "Alex Kim", Gender::Male)
            .await
            .unwrap();
        assert_eq!(
            store.get(CacheLayer::Manual, "alex kim").await.unwrap(),
            Some(Gender::Male)
        );
        assert_eq!(store.get(CacheLayer::ApiFullName, "alex kim").await.unwrap(), None);
    }
}
