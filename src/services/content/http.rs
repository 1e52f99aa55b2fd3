use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::services::content::client::{
    GenerationContext, GeneratorError, ResourceGenerator, ResourceSet, sanitize,
};

/// JSON-over-HTTP generator: `POST {content, context}` and read back a resource set,
/// either bare or wrapped as `{"resources": ...}`.
#[derive(Clone)]
pub struct HttpResourceGenerator {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpResourceGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the api key
        f.debug_struct("HttpResourceGenerator")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    content: &'a str,
    context: &'a GenerationContext,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateReply {
    Wrapped { resources: ResourceSet },
    Bare(ResourceSet),
}

impl HttpResourceGenerator {
    pub fn new(
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl ResourceGenerator for HttpResourceGenerator {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn generate(
        &self,
        content: &str,
        context: &GenerationContext,
    ) -> Result<ResourceSet, GeneratorError> {
        let mut req = self
            .client
            .post(self.endpoint.clone())
            .json(&GenerateRequest { content, context });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(GeneratorError::Status(status.as_u16()));
        }

        let set = match res.json::<GenerateReply>().await? {
            GenerateReply::Wrapped { resources } => resources,
            GenerateReply::Bare(resources) => resources,
        };
        Ok(sanitize(set))
    }
}
