//! Vision-model interaction: send the page image plus instructions, get text back.
//!
//! Two implementations of [`ModelGateway`] are provided:
//!
//! * [`ChatCompletionsGateway`]: speaks the OpenAI chat-completions wire
//!   format directly over `reqwest`, for any compatible `base_url`
//!   (SambaNova, vLLM, LiteLLM, OpenRouter …).
//! * [`ProviderGateway`]: delegates to an `edgequake_llm` provider, which
//!   covers OpenAI, Anthropic, Gemini, Ollama and friends by name.
//!
//! Neither retries. A failed call becomes one error row for that file.

use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::{ExtractError, GatewayError};
use crate::pipeline::encode::{png_data_uri, to_base64};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Capability: run one multimodal inference and return the reply text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send `instructions` and the PNG page image in a single user message.
    ///
    /// Returns the first choice's text, or `""` when the reply has no content.
    async fn infer(&self, image_png: &[u8], instructions: &str) -> Result<String, GatewayError>;
}

// ── OpenAI-compatible endpoint ───────────────────────────────────────────

/// Bodies longer than this are cut when quoted in an error message.
const MAX_ERROR_BODY: usize = 300;

/// Direct client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatCompletionsGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: Option<usize>,
    timeout_secs: u64,
}

impl ChatCompletionsGateway {
    /// Build the gateway and its HTTP client. The client is reused for every call.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::GatewayNotConfigured {
                provider: base_url.to_string(),
                hint: format!("HTTP client could not be built: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            temperature: 0.1,
            max_tokens: None,
            timeout_secs,
        })
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: Option<usize>) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, image_png: &[u8], instructions: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: [UserMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: instructions },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: png_data_uri(image_png),
                        },
                    },
                ],
            }],
        }
    }
}

#[async_trait]
impl ModelGateway for ChatCompletionsGateway {
    async fn infer(&self, image_png: &[u8], instructions: &str) -> Result<String, GatewayError> {
        let body = self.request_body(image_png, instructions);
        debug!(
            "POST {} (model {}, {} PNG bytes)",
            self.endpoint,
            self.model,
            image_png.len()
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                GatewayError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                GatewayError::Http(e.to_string())
            }
        })?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GatewayError::Auth {
                status: status.as_u16(),
                detail: truncate(&text, MAX_ERROR_BODY),
            });
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::MalformedResponse("response has no choices".into()))?;

        let content = choice
            .message
            .and_then(|m| m.content)
            .map(content_text)
            .unwrap_or_default();
        debug!("Model replied with {} chars", content.len());
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

/// Message content is usually a string; some servers send a list of text parts.
fn content_text(content: Value) -> String {
    match content {
        Value::String(s) => s,
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}\u{2026}")
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────

/// Gateway backed by any `edgequake_llm` vision provider.
#[derive(Clone)]
pub struct ProviderGateway {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: Option<usize>,
    timeout_secs: u64,
}

impl ProviderGateway {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout_secs: u64) -> Self {
        Self {
            provider,
            temperature: 0.1,
            max_tokens: None,
            timeout_secs,
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: Option<usize>) -> Self {
        self.max_tokens = n;
        self
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelGateway for ProviderGateway {
    async fn infer(&self, image_png: &[u8], instructions: &str) -> Result<String, GatewayError> {
        // detail "high" keeps fine print such as affiliation footnotes legible.
        let image = ImageData::new(to_base64(image_png), "image/png").with_detail("high");
        let messages = vec![ChatMessage::user_with_images(instructions, vec![image])];
        let options = self.options();

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| GatewayError::Timeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        debug!(
            "Provider replied: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Build the gateway for a run, from most-specific to least-specific:
///
/// 1. pre-built provider (`config.provider`)
/// 2. OpenAI-compatible `config.base_url`
/// 3. named provider (`config.provider_name`)
/// 4. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`
/// 5. `ProviderFactory::from_env()` auto-detection
///
/// Called once per run; the result is shared by every file.
pub fn resolve_gateway(config: &ExtractionConfig) -> Result<Arc<dyn ModelGateway>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(provider_gateway(Arc::clone(provider), config)));
    }

    if let Some(ref base_url) = config.base_url {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        info!("Using OpenAI-compatible endpoint {} with model {}", base_url, model);
        let gateway = ChatCompletionsGateway::new(
            base_url,
            config.api_key.clone(),
            model,
            config.api_timeout_secs,
        )?
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);
        return Ok(Arc::new(gateway));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return named_provider(name, model).map(|p| {
            Arc::new(provider_gateway(p, config)) as Arc<dyn ModelGateway>
        });
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let p = named_provider(&prov, &model)?;
            return Ok(Arc::new(provider_gateway(p, config)));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::GatewayNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No model endpoint configured and none could be auto-detected.\n\
                Pass --base-url with --api-key, or set OPENAI_API_KEY / ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(provider_gateway(llm_provider, config)))
}

fn provider_gateway(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> ProviderGateway {
    ProviderGateway::new(provider, config.api_timeout_secs)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
}

fn named_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    info!("Using provider {} with model {}", name, model);
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        ExtractError::GatewayNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway() -> ChatCompletionsGateway {
        ChatCompletionsGateway::new("https://api.example.com/v1/", Some("k".into()), "vision-1", 30)
            .unwrap()
            .with_temperature(0.1)
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(gateway().endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn request_has_text_then_inline_image() {
        let g = gateway();
        let body = serde_json::to_value(g.request_body(b"png", "extract authors")).unwrap();

        assert_eq!(body["model"], "vision-1");
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());

        let content = &body["messages"][0]["content"];
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(content[0], json!({"type": "text", "text": "extract authors"}));
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,cG5n");
    }

    #[test]
    fn content_parts_are_concatenated() {
        let parts = json!([
            {"type": "text", "text": "{\"authors\""},
            {"type": "text", "text": ":[]}"}
        ]);
        assert_eq!(content_text(parts), "{\"authors\":[]}");
        assert_eq!(content_text(Value::Null), "");
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc\u{2026}");
    }
}
