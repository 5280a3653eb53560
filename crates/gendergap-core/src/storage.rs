//! Article sources and writeback targets: a SQLite table of JSON records, or
//! a pair of directories with one JSON file per article.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, QueryBuilder, Sqlite};
use thiserror::Error;

use crate::article::{AnnotatedArticle, Article};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Article not found: {0}")]
    NotFound(String),
    #[error("Article id cannot be used as a file name: {0}")]
    InvalidId(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    outlet TEXT,
    published_at TEXT,
    last_modifier TEXT,
    record TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_at);
CREATE INDEX IF NOT EXISTS idx_articles_outlet ON articles(outlet);
";

/// Which articles a batch run picks up. Explicit ids override the date range.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Inclusive.
    pub begin_date: Option<NaiveDate>,
    /// Exclusive.
    pub end_date: Option<NaiveDate>,
    pub outlets: Vec<String>,
    pub ids: Vec<String>,
    pub limit: Option<usize>,
    /// Also pick up articles a previous run already annotated or skipped.
    pub force_update: bool,
}

impl ArticleFilter {
    #[must_use]
    pub fn accepts(
        &self,
        id: &str,
        outlet: Option<&str>,
        published_at: Option<DateTime<Utc>>,
        last_modifier: Option<&str>,
    ) -> bool {
        if !self.force_update && last_modifier.is_some_and(|m| !m.is_empty()) {
            return false;
        }
        if !self.outlets.is_empty() && !outlet.is_some_and(|o| self.outlets.iter().any(|x| x == o))
        {
            return false;
        }
        if !self.ids.is_empty() {
            return self.ids.iter().any(|x| x == id);
        }
        if self.begin_date.is_none() && self.end_date.is_none() {
            return true;
        }
        let Some(day) = published_at.map(|at| at.date_naive()) else {
            return false;
        };
        self.begin_date.is_none_or(|b| day >= b) && self.end_date.is_none_or(|e| day < e)
    }

    fn accepts_article(&self, article: &Article) -> bool {
        self.accepts(
            &article.id,
            article.outlet.as_deref(),
            article.published_at,
            article.last_modifier(),
        )
    }

    fn truncate(&self, ids: &mut Vec<String>) {
        if let Some(limit) = self.limit {
            ids.truncate(limit);
        }
    }
}

#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    /// Ids of the articles to process, in a stable order.
    async fn ids(&self, filter: &ArticleFilter) -> StorageResult<Vec<String>>;

    async fn load(&self, id: &str) -> StorageResult<Article>;

    /// Replace the stored record. Either the whole record is written or
    /// nothing is.
    async fn save(&self, record: &AnnotatedArticle) -> StorageResult<()>;
}

pub struct SqliteArticleStore {
    pool: Pool<Sqlite>,
}

impl SqliteArticleStore {
    pub async fn open(url: &str) -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Insert or replace a scraped article.
    pub async fn insert(&self, article: &Article) -> StorageResult<()> {
        let record = serde_json::to_string(article)?;
        sqlx::query(
            r"
            INSERT INTO articles (id, outlet, published_at, last_modifier, record, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                outlet = excluded.outlet,
                published_at = excluded.published_at,
                last_modifier = excluded.last_modifier,
                record = excluded.record,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&article.id)
        .bind(article.outlet.as_deref())
        .bind(article.published_at.map(|at| at.to_rfc3339()))
        .bind(article.last_modifier())
        .bind(record)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// `published_at` holds UTC rfc3339 text, so a date bound compares as a
/// string prefix.
fn select_ids(filter: &ArticleFilter) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new("SELECT id FROM articles WHERE 1 = 1");
    if !filter.force_update {
        query.push(" AND (last_modifier IS NULL OR last_modifier = '')");
    }
    if !filter.outlets.is_empty() {
        query.push(" AND outlet IN (");
        let mut list = query.separated(", ");
        for outlet in &filter.outlets {
            list.push_bind(outlet.clone());
        }
        list.push_unseparated(")");
    }
    if filter.ids.is_empty() {
        if let Some(begin) = filter.begin_date {
            query.push(" AND published_at >= ").push_bind(begin.to_string());
        }
        if let Some(end) = filter.end_date {
            query.push(" AND published_at < ").push_bind(end.to_string());
        }
    } else {
        query.push(" AND id IN (");
        let mut list = query.separated(", ");
        for id in &filter.ids {
            list.push_bind(id.clone());
        }
        list.push_unseparated(")");
    }
    query.push(" ORDER BY published_at, id");
    if let Some(limit) = filter.limit {
        query
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    query
}

#[async_trait::async_trait]
impl ArticleStore for SqliteArticleStore {
    async fn ids(&self, filter: &ArticleFilter) -> StorageResult<Vec<String>> {
        let mut query = select_ids(filter);
        let rows: Vec<(String,)> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn load(&self, id: &str) -> StorageResult<Article> {
        let row: (String,) = sqlx::query_as("SELECT record FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&row.0)?)
    }

    async fn save(&self, record: &AnnotatedArticle) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE articles SET record = ?, last_modifier = ?, updated_at = ? WHERE id = ?",
        )
        .bind(json)
        .bind(&record.last_modifier)
        .bind(Utc::now().to_rfc3339())
        .bind(record.id())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(record.id().to_string()));
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Reads `<in_dir>/<id>.json` and writes `<out_dir>/<id>.json`. Writes go to
/// a temporary file first and are renamed into place.
pub struct DirectoryStore {
    in_dir: PathBuf,
    out_dir: PathBuf,
}

impl DirectoryStore {
    #[must_use]
    pub fn new(in_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            in_dir: in_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    fn file_name(id: &str) -> StorageResult<String> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(format!("{id}.json"))
    }

    async fn read_article(path: &Path) -> StorageResult<Article> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait::async_trait]
impl ArticleStore for DirectoryStore {
    async fn ids(&self, filter: &ArticleFilter) -> StorageResult<Vec<String>> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.in_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut ids = Vec::new();
        for path in paths {
            let article = match Self::read_article(&path).await {
                Ok(article) => article,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable article file");
                    continue;
                }
            };
            if !filter.accepts_article(&article) {
                continue;
            }
            let done = Self::file_name(&article.id)
                .map(|name| self.out_dir.join(name).exists())
                .unwrap_or(false);
            if done && !filter.force_update {
                continue;
            }
            ids.push(article.id);
        }
        filter.truncate(&mut ids);
        Ok(ids)
    }

    async fn load(&self, id: &str) -> StorageResult<Article> {
        let path = self.in_dir.join(Self::file_name(id)?);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Self::read_article(&path).await
    }

    async fn save(&self, record: &AnnotatedArticle) -> StorageResult<()> {
        let name = Self::file_name(record.id())?;
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let tmp = self.out_dir.join(format!(".{name}.tmp"));
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.out_dir.join(name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::article::Annotation;

    fn article(id: &str, outlet: &str, day: u32) -> Article {
        Article::new(id, "Body.")
            .with_outlet(outlet)
            .with_published_at(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap())
    }

    fn date(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, day)
    }

    #[test]
    fn test_filter_dates_are_half_open() {
        let filter = ArticleFilter {
            begin_date: date(2),
            end_date: date(4),
            ..ArticleFilter::default()
        };
        let at = |day| Some(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap());
        assert!(!filter.accepts("a", None, at(1), None));
        assert!(filter.accepts("a", None, at(2), None));
        assert!(filter.accepts("a", None, at(3), None));
        assert!(!filter.accepts("a", None, at(4), None));
        assert!(!filter.accepts("a", None, None, None));
    }

    #[test]
    fn test_filter_ids_override_dates_and_force() {
        let filter = ArticleFilter {
            begin_date: date(2),
            ids: vec!["x".into()],
            ..ArticleFilter::default()
        };
        assert!(filter.accepts("x", None, None, None));
        assert!(!filter.accepts("y", None, None, None));
        assert!(!filter.accepts("x", None, None, Some("entity_gender_annotator")));

        let forced = ArticleFilter {
            force_update: true,
            ..filter
        };
        assert!(forced.accepts("x", None, None, Some("entity_gender_annotator")));
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip_and_filtering() {
        let store = SqliteArticleStore::open_memory().await.unwrap();
        store.insert(&article("a", "Post", 1)).await.unwrap();
        store.insert(&article("b", "Gazette", 2)).await.unwrap();
        store.insert(&article("c", "Post", 3)).await.unwrap();

        let filter = ArticleFilter {
            outlets: vec!["Post".into()],
            ..ArticleFilter::default()
        };
        assert_eq!(store.ids(&filter).await.unwrap(), vec!["a", "c"]);

        let record = AnnotatedArticle::annotated(
            store.load("a").await.unwrap(),
            Annotation::default(),
        );
        store.save(&record).await.unwrap();
        assert_eq!(store.ids(&filter).await.unwrap(), vec!["c"]);
        let reloaded = store.load("a").await.unwrap();
        assert_eq!(reloaded.last_modifier(), Some("entity_gender_annotator"));

        let limited = ArticleFilter {
            force_update: true,
            limit: Some(2),
            ..ArticleFilter::default()
        };
        assert_eq!(store.ids(&limited).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_sqlite_dates_and_ids() {
        let store = SqliteArticleStore::open_memory().await.unwrap();
        for (id, day) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            store.insert(&article(id, "Post", day)).await.unwrap();
        }
        store.insert(&Article::new("undated", "Body.")).await.unwrap();

        let range = ArticleFilter {
            begin_date: date(2),
            end_date: date(4),
            ..ArticleFilter::default()
        };
        assert_eq!(store.ids(&range).await.unwrap(), vec!["b", "c"]);

        let by_id = ArticleFilter {
            ids: vec!["d".into(), "undated".into()],
            ..range.clone()
        };
        assert_eq!(store.ids(&by_id).await.unwrap(), vec!["undated", "d"]);

        let elsewhere = ArticleFilter {
            outlets: vec!["Gazette".into()],
            ..ArticleFilter::default()
        };
        assert!(store.ids(&elsewhere).await.unwrap().is_empty());

        let everything = store.ids(&ArticleFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 5);
        assert!(select_ids(&range).sql().contains("published_at >= "));
    }

    #[tokio::test]
    async fn test_save_unknown_id_fails() {
        let store = SqliteArticleStore::open_memory().await.unwrap();
        let record = AnnotatedArticle::skipped(Article::new("ghost", ""));
        assert!(matches!(store.save(&record).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_directory_store() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for a in [article("a", "Post", 1), article("b", "Post", 2)] {
            let path = input.path().join(format!("{}.json", a.id));
            std::fs::write(path, serde_json::to_string(&a).unwrap()).unwrap();
        }
        std::fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let store = DirectoryStore::new(input.path(), output.path());
        let filter = ArticleFilter::default();
        assert_eq!(store.ids(&filter).await.unwrap(), vec!["a", "b"]);

        let record = AnnotatedArticle::skipped(store.load("a").await.unwrap());
        store.save(&record).await.unwrap();
        let written = std::fs::read_to_string(output.path().join("a.json")).unwrap();
        assert!(written.contains("max_body_len"));
        assert_eq!(store.ids(&filter).await.unwrap(), vec!["b"]);
        assert!(matches!(store.load("../x").await, Err(StorageError::InvalidId(_))));
    }
}
