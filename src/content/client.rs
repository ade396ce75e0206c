//! Content API client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::document::{ApiRoot, RawDocument, SearchResponse};
use crate::config::{ConfigError, SiteConfig};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request failed")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("content API at {0} has no master ref")]
    NoMasterRef(String),
}

/// Options for a typed query
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

impl QueryOptions {
    pub fn page_size(page_size: u32) -> Self {
        Self {
            page_size: Some(page_size),
            page: None,
        }
    }
}

/// Read access to the content backend
///
/// Documents are returned exactly as the backend sent them.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// One page of documents of the given type
    async fn query_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<SearchResponse, ClientError>;

    /// A single document by uid, `None` if it does not exist
    async fn get_by_uid(&self, doc_type: &str, uid: &str)
        -> Result<Option<RawDocument>, ClientError>;

    /// Follow a `next_page` cursor URL
    async fn fetch_page(&self, url: &str) -> Result<SearchResponse, ClientError>;
}

/// HTTP client for a Prismic-style REST API (v2)
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Create a client for `endpoint` (e.g. `https://repo.cdn.prismic.io/api/v2`)
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
            master_ref: OnceCell::new(),
        })
    }

    /// Create a client from the `prismic` section of the site config
    pub fn from_config(config: &SiteConfig) -> Result<Self, ClientError> {
        Self::new(
            config.endpoint()?,
            config.prismic.access_token.clone(),
            Duration::from_secs(config.prismic.request_timeout_secs),
        )
    }

    /// Ref of the published content, fetched once
    async fn master_ref(&self) -> Result<&str, ClientError> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let root: ApiRoot = self.get_json(&self.endpoint, &self.auth_query()).await?;
                let reference = root
                    .master_ref()
                    .ok_or_else(|| ClientError::NoMasterRef(self.endpoint.clone()))?;
                tracing::debug!("Content API master ref: {}", reference);
                Ok::<_, ClientError>(reference.to_string())
            })
            .await?;
        Ok(reference.as_str())
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        self.access_token
            .iter()
            .map(|token| ("access_token", token.clone()))
            .collect()
    }

    async fn search(
        &self,
        predicate: String,
        options: &QueryOptions,
    ) -> Result<SearchResponse, ClientError> {
        let mut query = vec![
            ("ref", self.master_ref().await?.to_string()),
            ("q", predicate),
        ];
        if let Some(page_size) = options.page_size {
            query.push(("pageSize", page_size.to_string()));
        }
        if let Some(page) = options.page {
            query.push(("page", page.to_string()));
        }
        query.extend(self.auth_query());

        let url = format!("{}/documents/search", self.endpoint);
        self.get_json(&url, &query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        // Never echo the access token back in errors or logs
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.without_url()))?;

        let mut shown = response.url().clone();
        shown.set_query(None);
        let shown = shown.to_string();

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: shown,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Http(e.without_url()))?;
        tracing::debug!("GET {} ({} bytes)", shown, body.len());
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { url: shown, source })
    }
}

#[async_trait]
impl ContentApi for PrismicClient {
    async fn query_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<SearchResponse, ClientError> {
        self.search(at_predicate("document.type", doc_type), options)
            .await
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
    ) -> Result<Option<RawDocument>, ClientError> {
        let field = format!("my.{}.uid", doc_type);
        let response = self
            .search(at_predicate(&field, uid), &QueryOptions::page_size(1))
            .await?;
        Ok(response.results.into_iter().next())
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchResponse, ClientError> {
        // Cursor URLs already carry ref, query and token
        self.get_json(url, &[]).await
    }
}

/// Build an `at` predicate, e.g. `[[at(document.type, "posts")]]`
fn at_predicate(field: &str, value: &str) -> String {
    let value = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[[at({}, \"{}\")]]", field, value)
}
