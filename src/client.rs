use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::metrics::Metrics;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// HTTP client for one OpenAI-compatible deployment.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

/// Configuration for creating a chat client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the deployment, without the /v1 suffix
    pub base_url: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model name to use for requests
    pub model: String,
    /// Request timeout duration
    pub timeout: Duration,
}

// Request types for the OpenAI Chat Completions API
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

/// Message content is either a plain string or a list of typed parts.
/// The parts form is what vision-capable servers expect for image input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message in the vision format: one text part and one image part.
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }
}

// Response types. Only the fields the suite reads are declared; servers may
// send more.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// Models list response
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<Model>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
}

/// Outcome of one chat call that reached the server.
///
/// An error status is data, not a failure: the suite records it and moves
/// on to the next request. Transport and schema problems are real errors
/// and surface as `Err` from [`ChatClient::chat`].
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Success(ChatSuccess),
    ApiError(ApiError),
}

#[derive(Debug, Clone)]
pub struct ChatSuccess {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub elapsed: Duration,
}

/// Non-success HTTP response. The body is kept verbatim; callers truncate
/// it when they store it.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub elapsed: Duration,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat completion request and time it end to end.
    ///
    /// One attempt per call, no retries: the suite measures the deployment
    /// as it is.
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Result<ChatOutcome> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(&request);

        if let Some(api_key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        Metrics::record_request_sent();
        let start = Instant::now();

        let response = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Err(self.classify_transport_error(e).into()),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            let elapsed = start.elapsed();

            log::debug!("chat request returned HTTP {}", status);
            Metrics::record_api_error(status);

            return Ok(ChatOutcome::ApiError(ApiError {
                status,
                message,
                elapsed,
            }));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(self.classify_transport_error(e).into()),
        };
        let elapsed = start.elapsed();

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ClientError::Parse(format!("response did not match the completion schema: {}", e))
        })?;
        let ChatResponse { choices, usage } = parsed;

        let choice = choices
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Parse("response contained no choices".to_string()))?;

        Metrics::record_success(
            usage.prompt_tokens as u64,
            usage.completion_tokens as u64,
            elapsed,
        );

        Ok(ChatOutcome::Success(ChatSuccess {
            content: choice.message.content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            elapsed,
        }))
    }

    /// Best-effort probe of the deployment's /model_info endpoint.
    ///
    /// The endpoint is not part of the OpenAI surface, so every failure is
    /// swallowed: a missing endpoint tells us nothing about the model.
    pub async fn model_info(&self) -> Option<serde_json::Value> {
        let url = format!("{}/model_info", self.base_url);
        let mut req = self.client.get(&url);

        if let Some(api_key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        match req.send().await {
            Ok(response) if response.status().is_success() => match response.json().await {
                Ok(value) => Some(value),
                Err(e) => {
                    log::debug!("model_info body was not JSON: {}", e);
                    None
                }
            },
            Ok(response) => {
                log::debug!("model_info returned HTTP {}", response.status());
                None
            }
            Err(e) => {
                log::debug!("model_info not reachable: {}", e);
                None
            }
        }
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else if e.is_connect() {
            ClientError::Connection(e.to_string())
        } else if e.is_request() {
            // Some connection-level failures surface as request errors
            let err_msg = e.to_string();
            if err_msg.contains("connection closed")
                || err_msg.contains("connection reset")
                || err_msg.contains("broken pipe")
                || err_msg.contains("connection refused")
            {
                ClientError::Connection(format!("Request error: {}", e))
            } else {
                ClientError::Other(format!("Request error: {}", e))
            }
        } else {
            ClientError::Other(e.to_string())
        }
    }
}

/// Wait for the server to become ready by polling the /v1/models endpoint.
///
/// All OpenAI-compatible backends support /v1/models, and a successful
/// listing means the server can actually answer requests, not just that
/// the process is alive.
pub async fn check_server_ready(
    base_url: &str,
    api_key: Option<&str>,
    total_timeout: Duration,
    retry_interval: Duration,
) -> Result<()> {
    let start_time = Instant::now();
    let mut attempt = 0;

    log::info!("Waiting for server to be ready at {}...", base_url);

    loop {
        attempt += 1;

        log::debug!(
            "Server readiness check attempt {}: GET {}/v1/models",
            attempt,
            base_url
        );

        // Short per-attempt timeout so one hung request does not eat the budget
        match tokio::time::timeout(
            Duration::from_secs(10),
            list_models(base_url, api_key, Duration::from_secs(10)),
        )
        .await
        {
            Ok(Ok(models)) => {
                log::info!(
                    "Server is ready ({} model{} available after {:.1}s)",
                    models.len(),
                    if models.len() == 1 { "" } else { "s" },
                    start_time.elapsed().as_secs_f64()
                );
                return Ok(());
            }
            Ok(Err(e)) => {
                log::debug!("Models endpoint returned error: {}", e);
            }
            Err(_) => {
                log::debug!("Models endpoint request timed out");
            }
        }

        let elapsed = start_time.elapsed();
        let remaining = total_timeout.saturating_sub(elapsed);

        if remaining.is_zero() {
            anyhow::bail!(
                "Server readiness timeout after {:.1}s. Server at {} did not become ready.",
                total_timeout.as_secs_f64(),
                base_url
            );
        }

        // Log progress every 30 seconds
        if attempt % 6 == 0 {
            log::info!(
                "Still waiting for server (elapsed: {:.0}s, timeout: {:.0}s)...",
                elapsed.as_secs_f64(),
                total_timeout.as_secs_f64()
            );
        }

        tokio::time::sleep(retry_interval.min(remaining)).await;
    }
}

// Helper function to list available models
pub async fn list_models(
    base_url: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Vec<Model>> {
    let client = Client::builder().timeout(timeout).build()?;

    let url = format!("{}/v1/models", base_url);
    let mut req = client.get(&url);

    if let Some(key) = api_key {
        req = req.header("Authorization", format!("Bearer {}", key));
    }

    let response = req
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to query models endpoint: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());
        anyhow::bail!("Models endpoint returned {}: {}", status, text);
    }

    let models_response: ModelsResponse = response
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse models response: {}", e))?;

    Ok(models_response.data)
}

// Helper function to pick a model when the config names none
pub async fn detect_model(
    base_url: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<String> {
    let models = list_models(base_url, api_key, timeout).await?;

    if models.is_empty() {
        anyhow::bail!("No models available from server at {}/v1/models", base_url);
    }

    let model = models[0].id.clone();

    if models.len() > 1 {
        log::info!("Found {} models, using: {}", models.len(), model);
        log::debug!(
            "Available models: {:?}",
            models.iter().map(|m| &m.id).collect::<Vec<_>>()
        );
    } else {
        log::info!("Detected model: {}", model);
    }

    Ok(model)
}
