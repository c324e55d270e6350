//! Client for the external admin/store service.
//!
//! The gateway never retries or caches admin responses: a non-success
//! answer is surfaced to the caller as an upstream error. An admin token,
//! when configured, rides along on every request.

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("upstream error: {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(
        base_url: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(AdminClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.header(ADMIN_TOKEN_HEADER, token);
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, UpstreamError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Upstream { status, body });
        }
        Ok(response)
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        let response = self
            .send(self.request(reqwest::Method::GET, path).query(query))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn get_items(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Value>, UpstreamError> {
        let response = self
            .send(self.request(reqwest::Method::GET, path).query(query))
            .await?;
        Ok(response.json::<ItemsResponse>().await?.items)
    }

    pub async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, UpstreamError> {
        let response = self
            .send(self.request(reqwest::Method::GET, path).query(query))
            .await?;
        Ok(response.text().await?)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        let response = self
            .send(self.request(reqwest::Method::POST, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn post_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, UpstreamError> {
        let response = self
            .send(self.request(reqwest::Method::POST, path).query(query))
            .await?;
        Ok(response.json().await?)
    }
}

/// Read-only client for the pipeline's polling endpoints, so consoles can
/// poll results through the gateway origin.
#[derive(Clone)]
pub struct PipelineClient {
    client: reqwest::Client,
    base_url: String,
}

impl PipelineClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(PipelineClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn latest(&self, path: &str) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Upstream { status, body });
        }
        Ok(response.json().await?)
    }
}
