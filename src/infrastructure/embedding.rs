//! Query embedding client for the catalog's vector space.
//!
//! Talks to an OpenAI-compatible `/embeddings` endpoint. Transient failures
//! (429, 5xx, transport errors) are retried with exponential backoff up to a
//! configured attempt budget.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Embeds query text into the catalog's vector space.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Configuration for the HTTP embedding client.
#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Embeddings client for OpenAI-compatible endpoints.
pub struct HttpEmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self> {
        anyhow::ensure!(!config.api_key.trim().is_empty(), "missing embedding API key");
        anyhow::ensure!(!config.model.trim().is_empty(), "missing embedding model name");

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid embedding API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model: config.model,
            max_retries: config.max_retries.max(1),
        })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl QueryEmbedder for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: text,
            };
            let response = self.client.post(&self.endpoint).json(&request).send().await;
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp
                            .json()
                            .await
                            .context("failed to parse embedding response")?;
                        let first = parsed
                            .data
                            .into_iter()
                            .next()
                            .context("embedding response contained no vectors")?;
                        return Ok(first.embedding);
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "embedding request failed, retrying");
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    anyhow::bail!("embedding request failed ({status}): {body}");
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    if retryable && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(error = %err, attempt, "embedding transport error, retrying");
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_requires_api_key() {
        let config = EmbeddingClientConfig::default();
        assert!(HttpEmbeddingClient::new(config).is_err());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = EmbeddingClientConfig {
            api_key: "sk-test".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
            ..Default::default()
        };
        let client = HttpEmbeddingClient::new(config).unwrap();
        assert_eq!(client.endpoint, "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(HttpEmbeddingClient::retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(HttpEmbeddingClient::retry_backoff(2), Duration::from_millis(2000));
        assert_eq!(HttpEmbeddingClient::retry_backoff(9), Duration::from_millis(16000));
    }
}
