use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{Inference, InferenceError, InferenceFuture, InferenceService};
use crate::config::InferenceConfig;
use crate::output::text_preview;

const PREDICT_PROMPT: &str = "\
Predict how the given text continues, in 1-2 words. If the last word is cut off, complete it.
Suggest up to 4 words only if you are very confident.
Respond with {KO} if you cannot predict a continuation or the text does not make sense.
Reply with the predicted text only and nothing more.";

const CORRECT_PROMPT: &str = "\
Correct the given text if it is wrong.
Do not be too aggressive with corrections and do not correct abbreviations.
Respond with {KO} if the text is correct or good enough.
Reply with the corrected text only and nothing more.";

const PULL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct PullResponse {
    status: Option<String>,
    error: Option<String>,
}

/// Ollama HTTP client for `/api/chat`
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Build a client for the configured host and model
    ///
    /// `OLLAMA_HOST` takes precedence over the configured host.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = resolve_base_url(&config.host, std::env::var("OLLAMA_HOST").ok());

        info!(host = %base_url, model = %config.model, "ollama client configured");

        Ok(Self {
            http,
            base_url,
            model: config.model.clone(),
        })
    }

    /// Model requests are sent to
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Names of the models installed on the backend
    ///
    /// # Errors
    /// Returns error if the backend is unreachable or replies with garbage
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).send().await?;
        let body = read_body(response).await?;
        let tags: TagsResponse = serde_json::from_str(&body)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Download the configured model on the backend
    ///
    /// # Errors
    /// Returns error if the backend is unreachable or reports a failure
    pub async fn pull_model(&self) -> Result<(), InferenceError> {
        let url = format!("{}/api/pull", self.base_url);
        info!(model = %self.model, "pulling model");

        let response = self
            .http
            .post(&url)
            .timeout(PULL_TIMEOUT)
            .json(&PullRequest {
                model: &self.model,
                stream: false,
            })
            .send()
            .await?;
        let body = read_body(response).await?;
        let reply: PullResponse = serde_json::from_str(&body)?;
        if let Some(error) = reply.error {
            return Err(InferenceError::Backend(error));
        }

        info!(model = %self.model, status = ?reply.status, "model pulled");
        Ok(())
    }

    /// Pull the configured model unless it is already installed
    ///
    /// Returns true if a pull happened.
    ///
    /// # Errors
    /// Returns error if listing or pulling fails
    pub async fn ensure_model(&self) -> Result<bool, InferenceError> {
        let installed = self.list_models().await?;
        if model_installed(&installed, &self.model) {
            info!(model = %self.model, "model already installed, skipping pull");
            return Ok(false);
        }

        info!(model = %self.model, available = ?installed, "model not installed");
        self.pull_model().await?;
        Ok(true)
    }

    async fn chat(&self, system: &str, text: &str) -> Result<Inference, InferenceError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            stream: false,
        };

        let start = Instant::now();
        let response = self.http.post(&url).json(&request).send().await?;
        let body = read_body(response).await?;
        let reply: ChatResponse = serde_json::from_str(&body)?;
        if let Some(error) = reply.error {
            return Err(InferenceError::Backend(error));
        }

        let content = reply.message.map(|m| m.content).unwrap_or_default();
        let content = strip_reasoning(&content);

        debug!(
            input_preview = %text_preview(text),
            reply_preview = %text_preview(content),
            inference_ms = start.elapsed().as_millis(),
            "chat completed"
        );

        Ok(Inference::from_reply(content))
    }
}

impl InferenceService for OllamaClient {
    fn predict(&self, text: &str) -> InferenceFuture {
        let client = self.clone();
        let text = text.to_owned();
        Box::pin(async move { client.chat(PREDICT_PROMPT, &text).await })
    }

    fn correct(&self, text: &str) -> InferenceFuture {
        let client = self.clone();
        let text = text.to_owned();
        Box::pin(async move { client.chat(CORRECT_PROMPT, &text).await })
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, InferenceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(InferenceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Base URL from the configured host and an optional `OLLAMA_HOST` value
fn resolve_base_url(configured: &str, env_host: Option<String>) -> String {
    let host = env_host
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| configured.to_owned());
    let host = host.trim().trim_end_matches('/');

    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    }
}

/// Whether `model` is in the installed list; a bare name matches any tag
fn model_installed(installed: &[String], model: &str) -> bool {
    installed.iter().any(|name| {
        name == model
            || (!model.contains(':')
                && name
                    .strip_prefix(model)
                    .is_some_and(|tag| tag.starts_with(':')))
    })
}

/// Drop a leading `<think>...</think>` block emitted by reasoning models
fn strip_reasoning(content: &str) -> &str {
    let trimmed = content.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<think>") {
        if let Some(end) = rest.find("</think>") {
            return rest[end + "</think>".len()..].trim_start_matches(['\r', '\n']);
        }
    }
    content
}
