use std::collections::HashMap;
use std::sync::Arc;

use super::{
    first_name, hard_rule, CacheLayer, ExternalGenderApi, Gender, GenderOracle, GenderResult,
    GenderStore, UpsertOutcome,
};

/// The gender service's policy: hard rules, then the cache layers in
/// priority order, then the external API, whose answers are written back.
pub struct LayeredGenderResolver {
    store: Arc<dyn GenderStore>,
    api: Option<Arc<dyn ExternalGenderApi>>,
}

impl LayeredGenderResolver {
    #[must_use]
    pub fn new(store: Arc<dyn GenderStore>) -> Self {
        Self { store, api: None }
    }

    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn ExternalGenderApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Gender of one name. Cache misses without an external API are unknown.
    pub async fn resolve(&self, name: &str) -> GenderResult<Gender> {
        if let Some(gender) = hard_rule(name) {
            return Ok(gender);
        }
        if let Some(gender) = self.from_cache(name).await? {
            return Ok(gender);
        }
        let Some(api) = &self.api else {
            return Ok(Gender::Unknown);
        };

        let answer = match api.lookup(name).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(name, error = %e, "external gender lookup failed");
                return Ok(Gender::Unknown);
            }
        };
        self.record(CacheLayer::ApiFullName, name, answer.gender).await?;
        if let Some(first) = answer.first_name.or_else(|| first_name(name)) {
            self.record(CacheLayer::ApiFirstName, &first, answer.gender).await?;
            self.record(CacheLayer::FirstName, &first, answer.gender).await?;
        }
        Ok(answer.gender)
    }

    /// First layer holding a resolved gender for the name.
    async fn from_cache(&self, name: &str) -> GenderResult<Option<Gender>> {
        let first = first_name(name).unwrap_or_default();
        for layer in CacheLayer::ALL {
            let key = if layer.by_first_name() { first.as_str() } else { name };
            if let Some(gender) = self.store.get(layer, key).await? {
                if gender.is_resolved() {
                    tracing::debug!(name, layer = layer.as_str(), %gender, "gender cache hit");
                    return Ok(Some(gender));
                }
            }
        }
        Ok(None)
    }

    async fn record(&self, layer: CacheLayer, key: &str, gender: Gender) -> GenderResult<()> {
        if let UpsertOutcome::Conflict { kept } = self.store.upsert(layer, key, gender).await? {
            tracing::warn!(
                key,
                layer = layer.as_str(),
                %kept,
                rejected = %gender,
                "conflicting gender kept existing cache entry"
            );
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GenderOracle for LayeredGenderResolver {
    async fn genders(&self, names: &[String]) -> GenderResult<HashMap<String, Gender>> {
        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            if out.contains_key(name) {
                continue;
            }
            let gender = self.resolve(name).await?;
            out.insert(name.clone(), gender);
        }
        Ok(out)
    }
}
