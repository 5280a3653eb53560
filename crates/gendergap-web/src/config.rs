use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use gendergap_core::AppConfig;

/// Service configuration, taken from the `GENDER_RECOGNITION` section.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub cache_url: String,
    pub genderapi_url: String,
    pub genderapi_token: Option<String>,
    pub timeout: Duration,
}

impl ServiceConfig {
    /// Reads the file named by `GENDERGAP_CONFIG`, or the default config
    /// file, plus the usual environment overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var_os("GENDERGAP_CONFIG").map(PathBuf::from);
        let config = AppConfig::load(path.as_deref())?;
        Ok(Self::from_app(&config))
    }

    #[must_use]
    pub fn from_app(config: &AppConfig) -> Self {
        let gender = &config.gender_recognition;
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], gender.port)),
            cache_url: gender.cache_url.clone(),
            genderapi_url: gender.genderapi_url.clone(),
            genderapi_token: gender.genderapi_token.clone(),
            timeout: Duration::from_secs(gender.timeout_seconds),
        }
    }
}
