//! Anthropic `/v1/messages` transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ProviderError, ProviderResult};
use super::pricing::estimate_cost;
use super::{Provider, ProviderResponse};

const DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

pub struct MessagesProvider {
    name: String,
    url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl MessagesProvider {
    pub fn new(
        name: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> ProviderResult<Self> {
        let name = name.into();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::from_transport(&name, &e))?;
        Ok(Self {
            name,
            url: base_url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
        })
    }
}

/// Decode a messages body: text blocks are concatenated, other block kinds
/// are ignored.
pub(crate) fn parse_response(
    provider: &str,
    model: &str,
    body: &str,
) -> ProviderResult<ProviderResponse> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(provider, e.to_string()))?;

    let text_blocks: Vec<String> = parsed
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect();
    if text_blocks.is_empty() {
        return Err(ProviderError::malformed(provider, "response has no text content"));
    }

    let tokens = parsed
        .usage
        .map(|u| u.input_tokens + u.output_tokens)
        .unwrap_or(0);
    Ok(ProviderResponse {
        content: text_blocks.join(""),
        tokens,
        cost: estimate_cost(model, tokens),
    })
}

#[async_trait]
impl Provider for MessagesProvider {
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

        let request = MessagesRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(provider = %self.name, model, prompt_chars = prompt.len(), "messages request");

        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
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
    fn test_parse_text_blocks() {
        let body = r#"{
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "world"}
            ],
            "usage": {"input_tokens": 30, "output_tokens": 12}
        }"#;
        let resp = parse_response("anthropic", "claude-sonnet-4", body).unwrap();
        assert_eq!(resp.content, "Hello world");
        assert_eq!(resp.tokens, 42);
    }

    #[test]
    fn test_parse_without_text_is_malformed() {
        let err = parse_response("anthropic", "claude-sonnet-4", r#"{"content": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let p = MessagesProvider::new("anthropic", None, None).unwrap();
        assert!(!p.is_available());
        assert!(matches!(
            p.call("claude-sonnet-4", "hi").await,
            Err(ProviderError::Unavailable { .. })
        ));
    }
}
