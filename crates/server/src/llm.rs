//! HTTP clients for the generative-language providers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tendero_agent::{GenerateOptions, LlmClient, LlmError};
use tendero_core::config::{LlmConfig, LlmProvider};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Builds the client selected by `llm.provider`.
pub fn from_config(config: &LlmConfig) -> Result<Box<dyn LlmClient>, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| LlmError::Provider(format!("http client setup failed: {error}")))?;
    let api_key = config.api_key.clone();

    Ok(match config.provider {
        LlmProvider::Gemini => Box::new(GeminiClient {
            client,
            base_url: base_url(config, GEMINI_BASE_URL),
            model: config.model.clone(),
            api_key: api_key.unwrap_or_else(|| SecretString::from(String::new())),
            timeout,
        }),
        LlmProvider::OpenAi | LlmProvider::Ollama => Box::new(OpenAiCompatClient {
            client,
            base_url: base_url(config, OPENAI_BASE_URL),
            model: config.model.clone(),
            api_key,
            timeout,
        }),
    })
}

fn base_url(config: &LlmConfig, default: &str) -> String {
    config.base_url.as_deref().unwrap_or(default).trim_end_matches('/').to_owned()
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    timeout: Duration,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| request_error(error, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(format!("gemini body: {error}")))?;
        parsed
            .candidates
            .into_iter()
            .flatten()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text.filter(|text| !text.trim().is_empty()))
            .map(|text| text.trim().to_owned())
            .ok_or_else(|| LlmError::InvalidResponse("gemini returned no text".to_owned()))
    }
}

/// Chat-completions client for OpenAI and OpenAI-compatible servers such as Ollama.
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": options.temperature,
            "max_tokens": options.max_output_tokens,
        });

        let mut request = self.client.post(format!("{}/chat/completions", self.base_url));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response =
            request.json(&body).send().await.map_err(|error| request_error(error, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(format!("chat completion body: {error}")))?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content.filter(|text| !text.trim().is_empty()))
            .map(|text| text.trim().to_owned())
            .ok_or_else(|| LlmError::InvalidResponse("chat completion had no content".to_owned()))
    }
}

fn request_error(error: reqwest::Error, timeout: Duration) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout(timeout)
    } else {
        LlmError::Provider(format!("request failed: {error}"))
    }
}

/// 429 and `RESOURCE_EXHAUSTED` bodies are quota; everything else is a provider failure.
fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let message = wrapper.error.message.unwrap_or_default();
            if status_text.is_empty() {
                message
            } else {
                format!("{status_text}: {message}")
            }
        })
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == StatusCode::TOO_MANY_REQUESTS || detail.contains("RESOURCE_EXHAUSTED") {
        LlmError::QuotaExceeded(format!("{status}: {detail}"))
    } else {
        LlmError::Provider(format!("{status}: {detail}"))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}
