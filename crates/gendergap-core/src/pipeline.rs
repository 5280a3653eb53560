//! The per-article pipeline: preprocess, parse, extract quotes, merge
//! entities, resolve speakers and annotate genders.

use std::sync::Arc;
use std::time::Duration;

use crate::annotate::{AuthorCleaner, GenderAnnotator};
use crate::article::{AnnotatedArticle, Annotation, Article};
use crate::config::AppConfig;
use crate::entities::EntityMerger;
use crate::error::{Error, Result};
use crate::gender::GenderOracle;
use crate::nlp::{
    preprocess_with, DocumentParser, HttpDocumentParser, Language, PatternParser,
    PreprocessOptions,
};
use crate::quote_merger::QuoteMerger;
use crate::quotes::{EnglishQuoteExtractor, FrenchQuoteExtractor, QuoteExtractor};
use crate::titles::TitleTaxonomy;

pub const DEFAULT_MAX_BODY_LENGTH: usize = 20_000;

pub struct ArticlePipeline {
    language: Language,
    options: PreprocessOptions,
    parser: Arc<dyn DocumentParser>,
    extractor: Box<dyn QuoteExtractor>,
    entity_merger: EntityMerger,
    quote_merger: QuoteMerger,
    annotator: GenderAnnotator,
    max_body_length: usize,
}

impl ArticlePipeline {
    /// A pipeline with the built-in lexicons for `language`.
    #[must_use]
    pub fn new(
        language: Language,
        parser: Arc<dyn DocumentParser>,
        oracle: Arc<dyn GenderOracle>,
    ) -> Self {
        let extractor: Box<dyn QuoteExtractor> = match language {
            Language::English => Box::new(EnglishQuoteExtractor::default()),
            Language::French => Box::new(FrenchQuoteExtractor::default()),
        };
        Self {
            language,
            options: PreprocessOptions::default(),
            parser,
            extractor,
            entity_merger: EntityMerger::default(),
            quote_merger: QuoteMerger::default(),
            annotator: GenderAnnotator::new(oracle),
            max_body_length: DEFAULT_MAX_BODY_LENGTH,
        }
    }

    /// Build the pipeline described by the `NLP` section: lexicons, titles,
    /// the parser service (with custom name patterns) and the body cap.
    pub fn from_config(config: &AppConfig, oracle: Arc<dyn GenderOracle>) -> Result<Self> {
        let nlp = &config.nlp;
        let language = nlp.language;
        let titles = nlp.titles()?;

        let http = HttpDocumentParser::new(
            nlp.parser_url.clone(),
            Duration::from_secs(nlp.parser_timeout_seconds),
        )?;
        let patterns = nlp.name_patterns()?;
        let parser: Arc<dyn DocumentParser> = if patterns.is_empty() {
            Arc::new(http)
        } else {
            Arc::new(PatternParser::new(Box::new(http), patterns))
        };

        let verbs = nlp.quote_verbs(language)?;
        let extractor: Box<dyn QuoteExtractor> = match language {
            Language::English => Box::new(
                EnglishQuoteExtractor::new(verbs).with_heuristic_window(nlp.heuristic_window),
            ),
            Language::French => Box::new(FrenchQuoteExtractor::new(verbs)),
        };

        let annotator = GenderAnnotator::new(oracle)
            .with_author_cleaner(AuthorCleaner::new(nlp.author_blocklist()?, titles.clone()))
            .with_titles(titles.clone());

        Ok(Self {
            language,
            options: PreprocessOptions::default(),
            parser,
            extractor,
            entity_merger: EntityMerger::new(titles.clone()),
            quote_merger: QuoteMerger::new(titles),
            annotator,
            max_body_length: nlp.max_body_length,
        })
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn QuoteExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_titles(mut self, titles: TitleTaxonomy) -> Self {
        self.entity_merger = EntityMerger::new(titles.clone());
        self.quote_merger = QuoteMerger::new(titles);
        self
    }

    #[must_use]
    pub fn with_annotator(mut self, annotator: GenderAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    #[must_use]
    pub const fn with_max_body_length(mut self, max: usize) -> Self {
        self.max_body_length = max;
        self
    }

    #[must_use]
    pub const fn with_preprocess_options(mut self, options: PreprocessOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Run every stage on one article. Bodies over the cap fail with
    /// [`Error::InputTooLarge`] before anything is parsed.
    pub async fn analyze(&self, article: &Article) -> Result<Annotation> {
        let length = article.body.chars().count();
        if length > self.max_body_length {
            return Err(Error::InputTooLarge {
                length,
                max: self.max_body_length,
            });
        }

        let text = preprocess_with(&article.body, self.language, self.options);
        let doc = self.parser.parse(&text).await?;

        let quotes = self.extractor.extract(&doc);
        for quote in &quotes {
            quote.validate(doc.char_len())?;
        }
        let entities = self.entity_merger.merge(&doc);
        let quotes = self.quote_merger.merge(&doc, quotes, &entities);

        tracing::debug!(
            article_id = %article.id,
            tokens = doc.len(),
            quotes = quotes.len(),
            entities = entities.len(),
            "article analyzed"
        );
        Ok(self
            .annotator
            .annotate(&article.authors, &entities, quotes)
            .await)
    }

    /// The record to write back. Oversized bodies yield the skip marker;
    /// every other failure is returned and the article left as it was.
    pub async fn process(&self, article: Article) -> Result<AnnotatedArticle> {
        match self.analyze(&article).await {
            Ok(annotation) => Ok(AnnotatedArticle::annotated(article, annotation)),
            Err(e) if e.is_skip() => {
                tracing::warn!(article_id = %article.id, error = %e, "skipping article");
                Ok(AnnotatedArticle::skipped(article))
            }
            Err(e) => Err(e),
        }
    }
}
