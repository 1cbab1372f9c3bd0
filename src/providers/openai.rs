//! OpenAI-compatible gateway for embeddings and chat completions
//!
//! Retries transient failures with exponential backoff; streaming parses
//! the SSE `data:` line protocol terminated by `[DONE]`.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::ChatConfig;
use crate::error::{Error, Result};

use super::chat::{ChatMessage, ChatProvider, Completion, TokenStream};
use super::embedding::EmbeddingProvider;

/// OpenAI-compatible API client with automatic retry
pub struct OpenAiClient {
    client: Client,
    config: ChatConfig,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        })
        .collect()
}

impl OpenAiClient {
    /// Create a new client from gateway configuration
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::upstream("Unknown error")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.base_url);
        let text = text.to_string();
        let model = self.config.embedding_model.clone();
        let api_key = self.config.api_key.clone();
        let client = self.client.clone();

        self.retry_request(|| {
            let url = url.clone();
            let text = text.clone();
            let model = model.clone();
            let api_key = api_key.clone();
            let client = client.clone();

            async move {
                let request = EmbedRequest { model, input: text };

                let response = client
                    .post(&url)
                    .bearer_auth(&api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::upstream(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::upstream(format!(
                        "Embedding failed: HTTP {}",
                        response.status()
                    )));
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::upstream(format!("Failed to parse embedding response: {}", e))
                })?;

                embed_response
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| Error::upstream("Embedding response contained no data"))
            }
        })
        .await
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = CompletionRequest {
            model: self.config.completion_model.clone(),
            messages: wire_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };
        let body = serde_json::to_value(&body)?;
        let api_key = self.config.api_key.clone();
        let client = self.client.clone();

        tracing::debug!("Requesting completion from {}", self.config.completion_model);

        self.retry_request(|| {
            let url = url.clone();
            let body = body.clone();
            let api_key = api_key.clone();
            let client = client.clone();

            async move {
                let response = client
                    .post(&url)
                    .bearer_auth(&api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::upstream(format!("Completion request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::upstream(format!(
                        "Completion failed: HTTP {} - {}",
                        status, body
                    )));
                }

                let completion: CompletionResponse = response.json().await.map_err(|e| {
                    Error::upstream(format!("Failed to parse completion response: {}", e))
                })?;

                let content = completion
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| Error::upstream("Completion contained no choices"))?;

                Ok(Completion {
                    content,
                    tokens_used: completion.usage.map(|u| u.total_tokens).unwrap_or(0),
                })
            }
        })
        .await
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = CompletionRequest {
            model: self.config.completion_model.clone(),
            messages: wire_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Stream request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "Stream failed: HTTP {}",
                response.status()
            )));
        }

        // Parse SSE lines, buffering partial lines across network chunks.
        let stream = response
            .bytes_stream()
            .scan(String::new(), |buf, chunk| {
                let item = match chunk {
                    Ok(bytes) => {
                        buf.push_str(&String::from_utf8_lossy(&bytes));
                        let mut output = String::new();
                        while let Some(pos) = buf.find('\n') {
                            let line: String = buf.drain(..=pos).collect();
                            let line = line.trim();
                            let Some(data) = line.strip_prefix("data:") else {
                                continue;
                            };
                            let data = data.trim();
                            if data == "[DONE]" {
                                continue;
                            }
                            if let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) {
                                if let Some(delta) = parsed
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.delta.content)
                                {
                                    output.push_str(&delta);
                                }
                            }
                        }
                        Ok(output)
                    }
                    Err(e) => Err(Error::upstream(format!("Stream error: {}", e))),
                };
                futures_util::future::ready(Some(item))
            })
            .filter(|item| {
                // Chunks that carried only protocol lines produce no text
                futures_util::future::ready(!matches!(item, Ok(s) if s.is_empty()))
            })
            .boxed();

        Ok(stream)
    }

    async fn health_check(&self) -> Result<bool> {
        EmbeddingProvider::health_check(self).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}
