use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::{Gender, GenderError, GenderResult};

/// What the external API said about one full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAnswer {
    pub gender: Gender,
    /// First name as the API split it, lowercased.
    pub first_name: Option<String>,
}

/// The paid name-to-gender API consulted after every cache layer missed.
#[async_trait::async_trait]
pub trait ExternalGenderApi: Send + Sync {
    async fn lookup(&self, full_name: &str) -> GenderResult<ApiAnswer>;
}

#[derive(Debug, Deserialize)]
struct SplitResponse {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

/// Client for gender-api.com's `get?split=` endpoint.
pub struct GenderApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl GenderApiClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> GenderResult<Self> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(GenderError::MissingToken)?
            .to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            token,
        })
    }

    fn request_url(&self, full_name: &str) -> GenderResult<Url> {
        let mut url = self.base_url.join("get")?;
        url.query_pairs_mut()
            .append_pair("split", full_name)
            .append_pair("key", &self.token);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ExternalGenderApi for GenderApiClient {
    async fn lookup(&self, full_name: &str) -> GenderResult<ApiAnswer> {
        let response = self.client.get(self.request_url(full_name)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenderError::Status(status.as_u16()));
        }
        let body: SplitResponse = response.json().await?;
        Ok(ApiAnswer {
            gender: body
                .gender
                .as_deref()
                .map_or(Ok(Gender::Unknown), str::parse)?,
            first_name: body
                .first_name
                .filter(|f| !f.is_empty())
                .map(|f| f.to_lowercase()),
        })
    }
}
