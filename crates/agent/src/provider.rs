//! HTTP chat-completions client. Speaks the common
//! `{model, messages, temperature, max_tokens}` request shape over HTTPS
//! with a bearer credential; both configured providers use this transport.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use lapak_core::config::ProviderConfig;

use crate::llm::{ChatProvider, ChatRequest, LlmError, ResponseFormatHint};

pub struct HttpChatProvider {
    name: String,
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpChatProvider {
    pub fn from_config(name: impl Into<String>, config: ProviderConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self { name: name.into(), client, config })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = WireRequest {
            model: &self.config.model,
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_format_hint.map(|hint| match hint {
                ResponseFormatHint::JsonObject => WireResponseFormat { format_type: "json_object" },
            }),
        };

        let mut http_request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        let response = http_request.send().await.map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let text = response.text().await.map_err(|e| LlmError::Http(e.to_string()))?;
        let parsed: WireResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(LlmError::Decode(error.message));
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use lapak_core::config::AppConfig;

    use super::HttpChatProvider;
    use crate::llm::ChatProvider;

    #[test]
    fn provider_builds_from_default_config() {
        let config = AppConfig::default();
        let provider = HttpChatProvider::from_config("primary", config.primary)
            .expect("client should initialize");
        assert_eq!(provider.name(), "primary");
    }

    #[test]
    fn wire_request_omits_response_format_when_no_hint() {
        let body = super::WireRequest {
            model: "gemini-2.5-flash",
            messages: vec![super::WireMessage { role: "user", content: "halo" }],
            temperature: 0.3,
            max_tokens: 256,
            response_format: None,
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert!(!json.contains("response_format"));

        let body = super::WireRequest {
            response_format: Some(super::WireResponseFormat { format_type: "json_object" }),
            ..body
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert!(json.contains(r#""response_format":{"type":"json_object"}"#));
    }

    #[test]
    fn wire_response_tolerates_missing_content() {
        let parsed: super::WireResponse =
            serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).expect("decode");
        assert!(parsed.choices[0].message.content.is_none());

        let parsed: super::WireResponse =
            serde_json::from_str(r#"{"error":{"message":"quota exceeded"}}"#).expect("decode");
        assert_eq!(parsed.error.expect("error present").message, "quota exceeded");
    }
}
