//! OpenAI-compatible `/chat/completions` transport.
//!
//! Serves OpenAI, xAI, Moonshot, DeepSeek and Perplexity, which all accept
//! the same request shape with bearer authentication.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ProviderError, ProviderResult};
use super::pricing::estimate_cost;
use super::{Provider, ProviderResponse};

/// Default endpoint for a known provider name.
pub(crate) fn default_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1/chat/completions"),
        "xai" => Some("https://api.x.ai/v1/chat/completions"),
        "moonshot" => Some("https://api.moonshot.cn/v1/chat/completions"),
        "deepseek" => Some("https://api.deepseek.com/chat/completions"),
        "perplexity" => Some("https://api.perplexity.ai/chat/completions"),
        _ => None,
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

pub struct ChatCompletionsProvider {
    name: String,
    url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl ChatCompletionsProvider {
    /// Create a transport for `name`. `base_url` overrides the known default
    /// and is required for unknown provider names.
    pub fn new(
        name: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> ProviderResult<Self> {
        let name = name.into();
        let url = match base_url {
            Some(url) => url,
            None => default_url(&name)
                .ok_or_else(|| ProviderError::Connection {
                    provider: name.clone(),
                    reason: "no endpoint configured".to_string(),
                })?
                .to_string(),
        };
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::from_transport(&name, &e))?;

        Ok(Self {
            name,
            url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Decode a chat completion body into text and token usage.
pub(crate) fn parse_response(
    provider: &str,
    model: &str,
    body: &str,
) -> ProviderResult<ProviderResponse> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(provider, e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::malformed(provider, "response has no choices"))?;

    let tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);
    Ok(ProviderResponse {
        content: choice.message.content.unwrap_or_default(),
        tokens,
        cost: estimate_cost(model, tokens),
    })
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, model: &str, prompt: &str) -> ProviderResult<ProviderResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable {
                provider: self.name.clone(),
            })?;

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(provider = %self.name, model, prompt_chars = prompt.len(), "chat completion request");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&self.name, &e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(&self.name, status, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&self.name, &e))?;
        parse_response(&self.name, model, &body)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_with_usage() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Paris"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let resp = parse_response("openai", "gpt-4o", body).unwrap();
        assert_eq!(resp.content, "Paris");
        assert_eq!(resp.tokens, 12);
        assert!(resp.cost > 0.0);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let err = parse_response("xai", "grok-3", r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_response_not_json() {
        let err = parse_response("xai", "grok-3", "<html>").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_known_endpoints() {
        let p = ChatCompletionsProvider::new("xai", Some("k".into()), None).unwrap();
        assert_eq!(p.url(), "https://api.x.ai/v1/chat/completions");
        assert!(ChatCompletionsProvider::new("nowhere", None, None).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let p = ChatCompletionsProvider::new("moonshot", Some("  ".into()), None).unwrap();
        assert!(!p.is_available());
        let err = p.call("moonshot-v1-8k", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }
}
