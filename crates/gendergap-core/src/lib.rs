pub mod annotate;
pub mod article;
pub mod batch;
pub mod config;
pub mod entities;
pub mod error;
pub mod gender;
pub mod lexicon;
pub mod nlp;
pub mod pipeline;
pub mod quote_merger;
pub mod quotes;
pub mod storage;
pub mod titles;

pub use annotate::{AuthorCleaner, GenderAnnotator};
pub use article::{AnnotatedArticle, Annotation, Article, MODIFIER_ANNOTATOR, MODIFIER_TOO_LARGE};
pub use batch::{BatchDriver, BatchOptions, BatchReport};
pub use config::{AppConfig, ConfigError};
pub use entities::{Entity, EntityMap, EntityMerger};
pub use error::{Error, Result};
pub use gender::{Gender, GenderOracle, GenderServiceClient, LayeredGenderResolver};
pub use nlp::{Document, DocumentParser, HttpDocumentParser, Language};
pub use pipeline::ArticlePipeline;
pub use quote_merger::QuoteMerger;
pub use quotes::{EnglishQuoteExtractor, FrenchQuoteExtractor, Quote, QuoteExtractor};
pub use storage::{ArticleFilter, ArticleStore, DirectoryStore, SqliteArticleStore, StorageError};
pub use titles::TitleTaxonomy;
