//! HttpSink - JSON article service over HTTP
//!
//! `PUT {base_url}/articles` stores a page, `PUT
//! {base_url}/articles/{id}/attachments` links its attachments. Both answer
//! `{"code": .., "data": .., "detailMessage": ..}`.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{Attachment, ContractError, NormalizedPage, RemoteSink, ResourceId, SinkResponse};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Configuration for HttpSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSinkConfig {
    /// Service root, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_url = params
            .get("base_url")
            .ok_or_else(|| "missing 'base_url' parameter".to_string())?
            .trim_end_matches('/')
            .to_string();

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(format!("invalid base_url '{}'", base_url));
        }

        let timeout_ms = match params.get("timeout_ms") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("invalid timeout_ms '{}': {}", raw, e))?,
            None => 10_000,
        };

        Ok(Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    fn articles_url(&self) -> String {
        format!("{}/articles", self.base_url)
    }

    fn attachments_url(&self, resource_id: &str) -> String {
        format!("{}/articles/{}/attachments", self.base_url, resource_id)
    }
}

/// Sink that stores pages through an HTTP article service
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
    client: reqwest::Client,
}

impl HttpSink {
    /// Create a new HttpSink
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Result<Self, ContractError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        debug!(sink = %name, base_url = %config.base_url, "HttpSink created");

        Ok(Self {
            name,
            config,
            client,
        })
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config =
            HttpSinkConfig::from_params(params).map_err(|e| ContractError::sink_write(&name, e))?;
        Self::new(name, config)
    }

    pub fn config(&self) -> &HttpSinkConfig {
        &self.config
    }

    fn transport_error(&self, e: reqwest::Error) -> ContractError {
        ContractError::sink_connection(&self.name, e.to_string())
    }

    /// Decode the service envelope
    ///
    /// A non-2xx status without a valid envelope becomes a failed response
    /// carrying the HTTP status as its code.
    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<SinkResponse<T>, ContractError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        match serde_json::from_str::<SinkResponse<T>>(&body) {
            Ok(decoded) => Ok(decoded),
            Err(_) if !status.is_success() => Ok(SinkResponse::failed(
                i32::from(status.as_u16()),
                format!("HTTP {}: {}", status, body.trim()),
            )),
            Err(e) => Err(ContractError::sink_write(
                &self.name,
                format!("invalid response body: {}", e),
            )),
        }
    }
}

impl RemoteSink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sink_write",
        skip(self, page),
        fields(sink = %self.name, url = %page.url)
    )]
    async fn write(&self, page: &NormalizedPage) -> Result<SinkResponse<ResourceId>, ContractError> {
        let response = self
            .client
            .put(self.config.articles_url())
            .json(page)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    #[instrument(
        name = "http_sink_attach",
        skip(self, attachments),
        fields(sink = %self.name, count = attachments.len())
    )]
    async fn attach(
        &self,
        resource_id: &ResourceId,
        attachments: &[Attachment],
    ) -> Result<SinkResponse<String>, ContractError> {
        let response = self
            .client
            .put(self.config.attachments_url(resource_id))
            .json(attachments)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }
}
