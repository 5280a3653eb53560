//! Batch driver: pick articles from a store, run the pipeline over them in
//! chunks and write the records back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::article::AnnotatedArticle;
use crate::error::Result;
use crate::pipeline::ArticlePipeline;
use crate::storage::{ArticleFilter, ArticleStore};

pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// CPU count, or 1 when it cannot be determined.
#[must_use]
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub chunk_size: usize,
    pub pool_size: usize,
    /// Run chunks concurrently. Parsers with non-reentrant state need this
    /// off.
    pub multiprocessing: bool,
    /// Analyze without writing anything back.
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pool_size: default_pool_size(),
            multiprocessing: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tally {
    processed: usize,
    skipped_too_large: usize,
    failed: usize,
}

impl Tally {
    fn add(&mut self, other: &Self) {
        self.processed += other.processed;
        self.skipped_too_large += other.skipped_too_large;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub skipped_too_large: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct BatchDriver {
    pipeline: Arc<ArticlePipeline>,
    store: Arc<dyn ArticleStore>,
    options: BatchOptions,
}

impl BatchDriver {
    #[must_use]
    pub fn new(pipeline: Arc<ArticlePipeline>, store: Arc<dyn ArticleStore>) -> Self {
        Self {
            pipeline,
            store,
            options: BatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Process every article the filter selects. Only listing the ids can
    /// fail; per-article failures are logged and counted.
    pub async fn run(&self, filter: &ArticleFilter) -> Result<BatchReport> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let ids = self.store.ids(filter).await?;
        let chunk_size = self.options.chunk_size.max(1);
        let chunks: Vec<Vec<String>> = ids.chunks(chunk_size).map(<[String]>::to_vec).collect();

        tracing::info!(
            %run_id,
            articles = ids.len(),
            chunks = chunks.len(),
            multiprocessing = self.options.multiprocessing,
            dry_run = self.options.dry_run,
            "batch started"
        );

        let tally = if self.options.multiprocessing {
            self.run_concurrent(chunks).await
        } else {
            let mut tally = Tally::default();
            for chunk in chunks {
                tally.add(
                    &process_chunk(&self.pipeline, self.store.as_ref(), chunk, self.options.dry_run)
                        .await,
                );
            }
            tally
        };

        let report = BatchReport {
            run_id,
            total: ids.len(),
            processed: tally.processed,
            skipped_too_large: tally.skipped_too_large,
            failed: tally.failed,
            dry_run: self.options.dry_run,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            %run_id,
            processed = report.processed,
            skipped = report.skipped_too_large,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }

    async fn run_concurrent(&self, chunks: Vec<Vec<String>>) -> Tally {
        let semaphore = Arc::new(Semaphore::new(self.options.pool_size.max(1)));
        let mut tasks = JoinSet::new();

        for chunk in chunks {
            let pipeline = Arc::clone(&self.pipeline);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let dry_run = self.options.dry_run;
            let size = chunk.len();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (size, None);
                };
                (size, Some(process_chunk(&pipeline, store.as_ref(), chunk, dry_run).await))
            });
        }

        let mut tally = Tally::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Some(chunk_tally))) => tally.add(&chunk_tally),
                Ok((size, None)) => tally.failed += size,
                Err(e) => {
                    tracing::error!(error = %e, "chunk task aborted");
                }
            }
        }
        tally
    }
}

async fn process_chunk(
    pipeline: &ArticlePipeline,
    store: &dyn ArticleStore,
    ids: Vec<String>,
    dry_run: bool,
) -> Tally {
    let mut tally = Tally::default();
    for id in ids {
        match process_one(pipeline, store, &id, dry_run).await {
            Ok(record) if record.is_skipped() => tally.skipped_too_large += 1,
            Ok(_) => tally.processed += 1,
            Err(e) => {
                tracing::error!(article_id = %id, error = %e, "article failed");
                tally.failed += 1;
            }
        }
    }
    tally
}

async fn process_one(
    pipeline: &ArticlePipeline,
    store: &dyn ArticleStore,
    id: &str,
    dry_run: bool,
) -> Result<AnnotatedArticle> {
    let article = store.load(id).await?;
    let record = pipeline.process(article).await?;
    if dry_run {
        tracing::debug!(article_id = %id, "dry run, not saved");
    } else {
        store.save(&record).await?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::article::Article;
    use crate::gender::{Gender, GenderOracle, GenderResult};
    use crate::nlp::testing::DocBuilder;
    use crate::nlp::{Document, DocumentParser, Language, ParseError, ParseResult, PreprocessedText};
    use crate::storage::SqliteArticleStore;

    struct QuietParser;

    #[async_trait::async_trait]
    impl DocumentParser for QuietParser {
        async fn parse(&self, text: &PreprocessedText) -> ParseResult<Document> {
            if text.text.starts_with("Broken") {
                return Err(ParseError::Status(500));
            }
            Ok(DocBuilder::new(text.clone())
                .tokens(&["Quiet quiet ADJ ROOT 0", ". . PUNCT punct 0"])
                .build())
        }
    }

    struct NoAnswers;

    #[async_trait::async_trait]
    impl GenderOracle for NoAnswers {
        async fn genders(&self, _names: &[String]) -> GenderResult<HashMap<String, Gender>> {
            Ok(HashMap::new())
        }
    }

    async fn seeded_store() -> Arc<SqliteArticleStore> {
        let store = SqliteArticleStore::open_memory().await.unwrap();
        for (id, body) in [
            ("a", "Quiet."),
            ("b", "Broken."),
            ("c", "Quiet."),
            ("d", "Quiet, but far too long for the configured cap."),
            ("e", "Quiet."),
        ] {
            store.insert(&Article::new(id, body)).await.unwrap();
        }
        Arc::new(store)
    }

    fn pipeline() -> Arc<ArticlePipeline> {
        Arc::new(
            ArticlePipeline::new(Language::English, Arc::new(QuietParser), Arc::new(NoAnswers))
                .with_max_body_length(20),
        )
    }

    fn options(multiprocessing: bool, dry_run: bool) -> BatchOptions {
        BatchOptions {
            chunk_size: 2,
            pool_size: 2,
            multiprocessing,
            dry_run,
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let store = seeded_store().await;
        let driver = BatchDriver::new(pipeline(), store.clone()).with_options(options(false, false));
        let report = driver.run(&ArticleFilter::default()).await.unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped_too_large, 1);
        assert_eq!(report.failed, 1);

        let untouched = store.load("b").await.unwrap();
        assert_eq!(untouched.last_modifier(), None);
        let skipped = store.load("d").await.unwrap();
        assert_eq!(skipped.last_modifier(), Some("max_body_len"));

        let again = driver.run(&ArticleFilter::default()).await.unwrap();
        assert_eq!(again.total, 1);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let store = seeded_store().await;
        let driver = BatchDriver::new(pipeline(), store).with_options(options(true, false));
        let report = driver.run(&ArticleFilter::default()).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped_too_large, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = seeded_store().await;
        let driver = BatchDriver::new(pipeline(), store.clone()).with_options(options(false, true));
        let report = driver.run(&ArticleFilter::default()).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(store.ids(&ArticleFilter::default()).await.unwrap().len(), 5);
    }

    #[test]
    fn test_default_options() {
        let options = BatchOptions::default();
        assert_eq!(options.chunk_size, 20);
        assert!(options.pool_size >= 1);
        assert!(!options.multiprocessing);
    }
}
