use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Category name -> ordered resources.
pub type ResourceSet = BTreeMap<String, Vec<ResourceItem>>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    pub course_title: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("content generator not configured")]
    NotConfigured,
    #[error("content generator transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("content generator returned status {0}")]
    Status(u16),
}

/// Remote resource generation. One call per request; no retry or backoff here.
#[async_trait]
pub trait ResourceGenerator: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;

    async fn generate(
        &self,
        content: &str,
        context: &GenerationContext,
    ) -> Result<ResourceSet, GeneratorError>;
}

/// Used when `CONTENT_GENERATOR_URL` is unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl ResourceGenerator for DisabledGenerator {
    fn backend_name(&self) -> &'static str {
        "disabled"
    }

    async fn generate(
        &self,
        _content: &str,
        _context: &GenerationContext,
    ) -> Result<ResourceSet, GeneratorError> {
        Err(GeneratorError::NotConfigured)
    }
}

/// Drop entries without a title or with a non-http(s) url, then empty categories.
pub fn sanitize(set: ResourceSet) -> ResourceSet {
    set.into_iter()
        .filter_map(|(category, items)| {
            let items: Vec<ResourceItem> = items
                .into_iter()
                .filter(|item| !item.title.trim().is_empty())
                .filter(|item| {
                    Url::parse(&item.url)
                        .map(|u| matches!(u.scheme(), "http" | "https"))
                        .unwrap_or(false)
                })
                .collect();
            let category = category.trim().to_string();
            (!items.is_empty() && !category.is_empty()).then_some((category, items))
        })
        .collect()
}
