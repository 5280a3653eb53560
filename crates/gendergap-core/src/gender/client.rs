use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use super::{Gender, GenderError, GenderOracle, GenderResult};

/// Client for the gender service's `GET /get-genders?people=a,b,c`.
pub struct GenderServiceClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GenderServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> GenderResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn request_url(&self, names: &[String]) -> GenderResult<Url> {
        let mut url = self.base_url.join("get-genders")?;
        url.query_pairs_mut().append_pair("people", &names.join(","));
        Ok(url)
    }
}

#[async_trait::async_trait]
impl GenderOracle for GenderServiceClient {
    async fn genders(&self, names: &[String]) -> GenderResult<HashMap<String, Gender>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let response = self.client.get(self.request_url(names)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenderError::Status(status.as_u16()));
        }
        let genders: HashMap<String, Gender> = response.json().await?;
        if genders.is_empty() {
            return Err(GenderError::EmptyResponse);
        }
        Ok(genders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let client = GenderServiceClient::new("http://localhost:5050", Duration::from_secs(1))
            .unwrap();
        let names = vec!["Marie Martin".to_string(), "Jean Dupont".to_string()];
        assert_eq!(
            client.request_url(&names).unwrap().as_str(),
            "http://localhost:5050/get-genders?people=Marie+Martin%2CJean+Dupont"
        );
    }

    #[tokio::test]
    async fn test_no_names_no_request() {
        let client = GenderServiceClient::new("http://127.0.0.1:9", Duration::from_secs(1))
            .unwrap();
        assert!(client.genders(&[]).await.unwrap().is_empty());
    }
}
