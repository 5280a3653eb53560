use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use gendergap_core::batch::{default_pool_size, DEFAULT_CHUNK_SIZE};
use gendergap_core::{
    AppConfig, ArticleFilter, ArticlePipeline, ArticleStore, BatchDriver, BatchOptions,
    BatchReport, DirectoryStore, GenderServiceClient, Language, SqliteArticleStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "gendergap",
    about = "Annotate news articles with who is quoted, mentioned and bylined, by gender",
    version
)]
pub struct Cli {
    /// First publication day to include (YYYY-MM-DD)
    #[arg(long = "begin_date")]
    pub begin_date: Option<NaiveDate>,
    /// Publication day to stop before (YYYY-MM-DD)
    #[arg(long = "end_date")]
    pub end_date: Option<NaiveDate>,
    /// Comma-separated outlet names
    #[arg(long, value_delimiter = ',')]
    pub outlets: Vec<String>,
    /// Comma-separated article ids; overrides the date range
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<String>,
    /// Re-process articles that were already annotated
    #[arg(long = "force_update")]
    pub force_update: bool,
    /// Analyze without writing results back
    #[arg(long = "dry_run")]
    pub dry_run: bool,
    /// Read articles from JSON files in this directory instead of the store
    #[arg(long = "in_dir", requires = "out_dir")]
    pub in_dir: Option<PathBuf>,
    /// Write annotated JSON files here
    #[arg(long = "out_dir", requires = "in_dir")]
    pub out_dir: Option<PathBuf>,
    /// Process at most this many articles
    #[arg(long)]
    pub limit: Option<usize>,
    /// Number of chunks processed at once
    #[arg(long, default_value_t = default_pool_size())]
    pub poolsize: usize,
    /// Articles per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunksize: usize,
    /// Process chunks concurrently
    #[arg(long)]
    pub multiprocessing: bool,
    /// Configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Article language (en or fr); overrides the configuration
    #[arg(long)]
    pub lang: Option<Language>,
}

impl Cli {
    #[must_use]
    pub fn filter(&self) -> ArticleFilter {
        ArticleFilter {
            begin_date: self.begin_date,
            end_date: self.end_date,
            outlets: self.outlets.clone(),
            ids: self.ids.clone(),
            limit: self.limit,
            force_update: self.force_update,
        }
    }

    #[must_use]
    pub const fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            chunk_size: self.chunksize,
            pool_size: self.poolsize,
            multiprocessing: self.multiprocessing,
            dry_run: self.dry_run,
        }
    }
}

pub async fn run(cli: Cli) -> Result<BatchReport> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(lang) = cli.lang {
        config.nlp.language = lang;
    }

    let gender = &config.gender_recognition;
    let oracle = GenderServiceClient::new(
        &gender.service_url(),
        Duration::from_secs(gender.timeout_seconds),
    )
    .context("creating gender service client")?;
    let pipeline = ArticlePipeline::from_config(&config, Arc::new(oracle))
        .context("building pipeline")?;

    let store: Arc<dyn ArticleStore> = match (&cli.in_dir, &cli.out_dir) {
        (Some(in_dir), Some(out_dir)) => Arc::new(DirectoryStore::new(in_dir, out_dir)),
        _ => {
            let url = config.store.connection_url();
            Arc::new(
                SqliteArticleStore::open(&url)
                    .await
                    .with_context(|| format!("opening article store {url}"))?,
            )
        }
    };

    tracing::info!(language = ?pipeline.language(), "starting batch");
    let driver = BatchDriver::new(Arc::new(pipeline), store).with_options(cli.batch_options());
    let report = driver.run(&cli.filter()).await?;
    Ok(report)
}
