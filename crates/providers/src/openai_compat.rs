//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any other endpoint that
//! exposes `/chat/completions`. Implements both the text communicator and
//! the vision client (images are sent inline as base64 data URLs).

use std::path::Path;
use std::time::Duration;

use anvil_config::AppConfig;
use anvil_core::error::ProviderError;
use anvil_core::message::{Conversation, Message};
use anvil_core::provider::{Communicator, VisionClient};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transport_error;

/// An OpenAI-compatible chat provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    image_model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider for `base_url` using `model` for text and images.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let model = model.into();
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            image_model: model.clone(),
            model,
            temperature: 0.7,
            max_tokens: 4096,
            client: http_client(Duration::from_secs(120))?,
        })
    }

    /// Build the provider described by the `[model]` section of `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            name: "openai".into(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.llm_model.clone(),
            image_model: config.model.image_model.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            client: http_client(Duration::from_secs(config.model.request_timeout_secs))?,
        })
    }

    /// The model used for text turns.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: serde_json::Value::String(m.content.clone()),
            })
            .collect()
    }

    /// POST one completion request and return the first choice's text.
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ApiMessage>,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key set; run `anvil onboard` or set ANVIL_API_KEY".into(),
            )
        })?;
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        debug!(provider = %self.name, model = %model, messages = messages_len(&body), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after(&response).unwrap_or(5),
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

fn messages_len(body: &serde_json::Value) -> usize {
    body["messages"].as_array().map_or(0, Vec::len)
}

fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// MIME type for an image, from its extension.
fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Inline `bytes` as a `data:` URL.
fn data_url(path: &Path, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{encoded}", image_mime(path))
}

#[async_trait]
impl Communicator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        prompt: &str,
        mut context: Conversation,
    ) -> Result<(String, Conversation), ProviderError> {
        context.push(Message::user(prompt));
        let reply = self
            .complete(&self.model, Self::to_api_messages(&context.messages))
            .await?;
        context.push(Message::assistant(reply.clone()));
        Ok((reply, context))
    }
}

#[async_trait]
impl VisionClient for OpenAiCompatProvider {
    async fn analyze(&self, message: &str, image_path: &Path) -> Result<String, ProviderError> {
        let bytes = tokio::fs::read(image_path).await.map_err(|e| ProviderError::ApiError {
            status_code: 0,
            message: format!("Cannot read image '{}': {e}", image_path.display()),
        })?;

        let content = serde_json::json!([
            { "type": "text", "text": message },
            { "type": "image_url", "image_url": { "url": data_url(image_path, &bytes) } },
        ]);
        let messages = vec![ApiMessage {
            role: "user".into(),
            content,
        }];

        self.complete(&self.image_model, messages).await
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiReply,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_base_url() {
        let provider =
            OpenAiCompatProvider::new("local", "http://localhost:11434/v1/", None, "llama3").unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
        assert_eq!(provider.model(), "llama3");
    }

    #[test]
    fn from_config_uses_model_section() {
        let mut config = AppConfig::default();
        config.model.llm_model = "gpt-x".into();
        config.model.image_model = "vision-x".into();
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.model(), "gpt-x");
        assert_eq!(provider.image_model, "vision-x");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[1].content, "Hello");
    }

    #[test]
    fn image_data_url() {
        assert_eq!(data_url(Path::new("a.PNG"), b"hi"), "data:image/png;base64,aGk=");
        assert!(data_url(Path::new("photo.jpeg"), b"").starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider =
            OpenAiCompatProvider::new("openai", "http://127.0.0.1:9", None, "m").unwrap();
        let err = provider.chat("hi", Conversation::new()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn parse_completion_response() {
        let data = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"<<<FINISH:'ok'>>>"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("<<<FINISH:'ok'>>>")
        );
    }
}
