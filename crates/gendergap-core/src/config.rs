use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lexicon::{AuthorBlocklist, NamePatterns, QuoteVerbs};
use crate::nlp::Language;
use crate::titles::TitleTaxonomy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid name pattern on line {line}: {source}")]
    NamePattern {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid blocklist pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Backing-store connection. The host/credential fields are carried through
/// for deployments that compose their own URL; the store itself only reads
/// `url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, rename = "authSource")]
    pub auth_source: Option<String>,
    #[serde(default, rename = "readPreference")]
    pub read_preference: Option<String>,
}

impl StoreConfig {
    #[must_use]
    pub fn connection_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| "sqlite:gendergap.db?mode=rwc".to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteVerbPaths {
    #[serde(default)]
    pub en: Option<PathBuf>,
    #[serde(default)]
    pub fr: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct NlpConfig {
    /// Bodies longer than this many characters are skipped before parsing.
    pub max_body_length: usize,
    #[serde(default)]
    pub quote_verbs: QuoteVerbPaths,
    #[serde(default)]
    pub author_blocklist: Option<PathBuf>,
    #[serde(default)]
    pub name_patterns: Option<PathBuf>,
    #[serde(default)]
    pub titles: Option<PathBuf>,
    pub parser_url: String,
    pub parser_timeout_seconds: u64,
    pub language: Language,
    /// Token window searched around heuristic quotes for a reporting verb.
    pub heuristic_window: usize,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            max_body_length: 20_000,
            quote_verbs: QuoteVerbPaths::default(),
            author_blocklist: None,
            name_patterns: None,
            titles: None,
            parser_url: "http://localhost:5000/parse".to_string(),
            parser_timeout_seconds: 120,
            language: Language::English,
            heuristic_window: 4,
        }
    }
}

impl NlpConfig {
    pub fn quote_verbs(&self, language: Language) -> Result<QuoteVerbs, ConfigError> {
        let path = match language {
            Language::English => self.quote_verbs.en.as_deref(),
            Language::French => self.quote_verbs.fr.as_deref(),
        };
        path.map_or_else(|| Ok(QuoteVerbs::builtin(language)), QuoteVerbs::load)
    }

    pub fn author_blocklist(&self) -> Result<AuthorBlocklist, ConfigError> {
        self.author_blocklist
            .as_deref()
            .map_or_else(AuthorBlocklist::builtin, AuthorBlocklist::load)
    }

    pub fn name_patterns(&self) -> Result<NamePatterns, ConfigError> {
        self.name_patterns
            .as_deref()
            .map_or_else(|| Ok(NamePatterns::default()), NamePatterns::load)
    }

    pub fn titles(&self) -> Result<TitleTaxonomy, ConfigError> {
        self.titles
            .as_deref()
            .map_or_else(|| Ok(TitleTaxonomy::default()), TitleTaxonomy::load)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct GenderRecognitionConfig {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing)]
    pub genderapi_token: Option<String>,
    pub genderapi_url: String,
    /// sqlx URL of the name cache owned by the gender service.
    pub cache_url: String,
    pub timeout_seconds: u64,
}

impl Default for GenderRecognitionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5050,
            genderapi_token: None,
            genderapi_url: "https://gender-api.com".to_string(),
            cache_url: "sqlite:gender_cache.db?mode=rwc".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl GenderRecognitionConfig {
    #[must_use]
    pub fn service_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "MONGO_ARGS", default)]
    pub store: StoreConfig,
    #[serde(rename = "NLP", default)]
    pub nlp: NlpConfig,
    #[serde(rename = "GENDER_RECOGNITION", default)]
    pub gender_recognition: GenderRecognitionConfig,
}

impl AppConfig {
    /// `<config_dir>/gendergap/config.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gendergap").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the given file, or the default file when it exists, or defaults;
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("GENDERGAP_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(url) = var("GENDERGAP_PARSER_URL") {
            self.nlp.parser_url = url;
        }
        if let Some(lang) = var("GENDERGAP_LANGUAGE").and_then(|l| l.parse().ok()) {
            self.nlp.language = lang;
        }
        if let Some(host) = var("GENDERGAP_GENDER_HOST") {
            self.gender_recognition.host = host;
        }
        if let Some(port) = var("GENDERGAP_GENDER_PORT").and_then(|p| p.parse().ok()) {
            self.gender_recognition.port = port;
        }
        if let Some(url) = var("GENDERGAP_GENDER_CACHE_URL") {
            self.gender_recognition.cache_url = url;
        }
        if let Some(token) = var("GENDERAPI_TOKEN") {
            self.gender_recognition.genderapi_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nlp.max_body_length == 0 {
            return Err(ConfigError::Invalid("NLP.MAX_BODY_LENGTH must be positive".into()));
        }
        if self.gender_recognition.host.is_empty() {
            return Err(ConfigError::Invalid("GENDER_RECOGNITION.HOST is empty".into()));
        }
        if self.gender_recognition.port == 0 {
            return Err(ConfigError::Invalid("GENDER_RECOGNITION.PORT is zero".into()));
        }
        url::Url::parse(&self.nlp.parser_url)?;
        url::Url::parse(&self.gender_recognition.genderapi_url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.nlp.max_body_length, 20_000);
        assert_eq!(config.gender_recognition.service_url(), "http://localhost:5050");
    }

    #[test]
    fn test_parses_enumerated_keys() {
        let json = r#"{
            "MONGO_ARGS": {"host": "db.internal", "port": 27017, "authSource": "admin"},
            "NLP": {
                "MAX_BODY_LENGTH": 5000,
                "PARSER_URL": "http://parser:5000/parse",
                "PARSER_TIMEOUT_SECONDS": 30,
                "LANGUAGE": "fr",
                "HEURISTIC_WINDOW": 3,
                "QUOTE_VERBS": {"fr": "/etc/gendergap/verbs_fr.txt"}
            },
            "GENDER_RECOGNITION": {
                "HOST": "genders", "PORT": 5001, "GENDERAPI_TOKEN": "secret",
                "GENDERAPI_URL": "https://gender-api.com", "CACHE_URL": "sqlite::memory:",
                "TIMEOUT_SECONDS": 10
            }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.store.auth_source.as_deref(), Some("admin"));
        assert_eq!(config.nlp.language, Language::French);
        assert_eq!(config.nlp.max_body_length, 5000);
        assert_eq!(
            config.nlp.quote_verbs.fr.as_deref(),
            Some(Path::new("/etc/gendergap/verbs_fr.txt"))
        );
        assert_eq!(config.gender_recognition.genderapi_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = AppConfig::default();
        config.gender_recognition.genderapi_token = Some("secret".into());
        config.store.password = Some("hunter2".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "GENDERGAP_GENDER_PORT" => Some("6000".into()),
            "GENDERGAP_LANGUAGE" => Some("french".into()),
            "GENDERAPI_TOKEN" => Some("tok".into()),
            _ => None,
        });
        assert_eq!(config.gender_recognition.port, 6000);
        assert_eq!(config.nlp.language, Language::French);
        assert_eq!(config.gender_recognition.genderapi_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.nlp.max_body_length = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.nlp.parser_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_builtin_lexicons_when_unset() {
        let nlp = NlpConfig::default();
        assert!(!nlp.quote_verbs(Language::English).unwrap().is_empty());
        assert!(nlp.name_patterns().unwrap().is_empty());
        assert!(nlp.author_blocklist().unwrap().is_blocked("Staff"));
    }
}
