use std::sync::Arc;

use gendergap_core::gender::{GenderApiClient, GenderStore, SqliteGenderStore};
use gendergap_core::LayeredGenderResolver;

use crate::config::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GenderStore>,
    pub resolver: Arc<LayeredGenderResolver>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn GenderStore>, resolver: LayeredGenderResolver) -> Self {
        Self {
            store,
            resolver: Arc::new(resolver),
        }
    }

    /// Open the cache and attach the external API when a token is set.
    pub async fn open(config: &ServiceConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn GenderStore> = Arc::new(SqliteGenderStore::open(&config.cache_url).await?);
        let mut resolver = LayeredGenderResolver::new(Arc::clone(&store));

        match config.genderapi_token.as_deref() {
            Some(token) if !token.is_empty() => {
                let api = GenderApiClient::new(&config.genderapi_url, Some(token), config.timeout)?;
                resolver = resolver.with_api(Arc::new(api));
            }
            _ => tracing::warn!("no GENDERAPI_TOKEN set, cache misses will be unknown"),
        }

        Ok(Self::new(store, resolver))
    }
}
