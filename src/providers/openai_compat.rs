use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error, warn};

const OLLAMA_API_BASE: &str
  = "http://localhost:11434/v1";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionBody<'a>
{   model: &'a str
  , messages: &'a [crate::request::ChatMessage]
  , temperature: f32
  , max_tokens: usize
  , top_p: f32
  , stream: bool
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ResponseMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

// ===== Client =====

/// Transport for any OpenAI-compatible `/chat/completions`
/// endpoint (Ollama, LiteLLM proxies)
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient
{   api_base: String
  , api_key: Option<String>
  , /// Registry prefix removed from model names before sending
    routing_prefix: Option<String>
  , http_client: reqwest::Client
}

impl OpenAiCompatClient
{   pub fn new(
      api_base: impl Into<String>
    , api_key: Option<String>
    ) -> Self
    {   let api_base = api_base.into();
        debug!("Creating OpenAiCompatClient for {}", api_base);
        OpenAiCompatClient
        {   api_base: api_base.trim_end_matches('/').to_string()
          , api_key
          , routing_prefix: None
          , http_client: reqwest::Client::new()
        }
    }

    /// Local Ollama server, no key. Takes `ollama/`-prefixed
    /// names from the default registry.
    pub fn ollama() -> Self
    {   OpenAiCompatClient::new(OLLAMA_API_BASE, None)
          .with_routing_prefix(Some(crate::registry::OLLAMA_PREFIX))
    }

    pub fn with_routing_prefix(mut self, prefix: Option<&str>) -> Self
    {   self.routing_prefix = prefix
          .filter(|p| !p.is_empty())
          .map(str::to_string);
        self
    }

    pub fn from_config(config: &crate::config::ProviderConfig)
      -> Result<Self, crate::error::Error>
    {   let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        let mut client = OpenAiCompatClient::new(
          config.api_base.clone()
        , config.api_key()?
        );
        client.http_client = http_client;
        Ok(client.with_routing_prefix(config.routing_prefix.as_deref()))
    }

    pub fn api_base(&self) -> &str
    {   &self.api_base
    }

    /// Model name as the endpoint knows it
    pub fn wire_model<'a>(&self, model: &'a str) -> &'a str
    {   match &self.routing_prefix
        {   Some(prefix) => model.strip_prefix(prefix.as_str())
              .unwrap_or(model)
          , None => model
        }
    }

    fn body<'a>(&self, request: &'a crate::request::ChatRequest)
      -> ChatCompletionBody<'a>
    {   ChatCompletionBody
        {   model: self.wire_model(&request.model)
          , messages: &request.messages
          , temperature: request.temperature
          , max_tokens: request.max_tokens
          , top_p: request.top_p
          , stream: false
        }
    }
}

#[async_trait]
impl crate::transport::Transport for OpenAiCompatClient
{   async fn complete(
      &self
    , request: &crate::request::ChatRequest
    ) -> Result<Option<String>, crate::error::Error>
    {   debug!("Sending completion for: {}", request.model);
        trace!("Completion request: {:?}", request);

        let body = self.body(request);
        let mut builder = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .header("Content-Type", "application/json")
          .json(&body);
        if let Some(key) = &self.api_key
        {   builder = builder
              .header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            if e.is_timeout()
            {   crate::error::Error::Timeout
            } else
            {   crate::error::Error::HttpError(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("Completion response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            return Err(classify_failure(status.as_u16(), error_text));
        }

        let chat_response: ChatCompletionResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        first_content(chat_response)
    }
}

/// Map a non-success status and its body onto the error taxonomy
pub fn classify_failure(status: u16, body: String)
  -> crate::error::Error
{   if status == 429
    {   warn!("Rate limited: {}", body);
        return crate::error::Error::RateLimitExceeded;
    }
    if crate::error::mentions_context_overflow(&body)
    {   error!("Context window exceeded: {}", body);
        return crate::error::Error::ContextWindowExceeded(body);
    }
    error!("API error {}: {}", status, body);
    crate::error::Error::ApiError(format!("{}: {}", status, body))
}

/// Text of the first choice, `None` when it carried no content
pub fn first_content(response: ChatCompletionResponse)
  -> Result<Option<String>, crate::error::Error>
{   let choice = response.choices.into_iter().next()
      .ok_or_else(|| {
        error!("No choices in response");
        crate::error::Error::NoChoicesInResponse
      })?;
    if choice.message.content.is_none()
    {   warn!(
          "Response without content, finish_reason: {:?}",
          choice.finish_reason
        );
    }
    Ok(choice.message.content)
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::error::Error;

    #[test]
    fn status_429_is_rate_limit()
    {   assert_eq!(
          classify_failure(429, "slow down".to_string()),
          Error::RateLimitExceeded
        );
    }

    #[test]
    fn overflow_body_is_structured()
    {   let err = classify_failure(
          400,
          "This model's maximum context length is 4096 tokens".to_string()
        );
        assert!(matches!(err, Error::ContextWindowExceeded(_)));
    }

    #[test]
    fn other_statuses_are_api_errors()
    {   assert_eq!(
          classify_failure(500, "boom".to_string()),
          Error::ApiError("500: boom".to_string())
        );
    }

    #[test]
    fn null_content_is_none()
    {   let response: ChatCompletionResponse = serde_json::from_str(
          r#"{"choices":[{"message":{"role":"assistant","content":null},
              "finish_reason":"length"}]}"#
        ).unwrap();
        assert_eq!(first_content(response), Ok(None));
    }

    #[test]
    fn first_choice_text_is_returned()
    {   let response: ChatCompletionResponse = serde_json::from_str(
          r#"{"choices":[{"message":{"role":"assistant","content":"4"},
              "finish_reason":"stop"}]}"#
        ).unwrap();
        assert_eq!(first_content(response), Ok(Some("4".to_string())));
    }

    #[test]
    fn empty_choices_is_an_error()
    {   let response: ChatCompletionResponse
          = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(
          first_content(response),
          Err(Error::NoChoicesInResponse)
        );
    }

    #[test]
    fn body_carries_request_fields()
    {   let request = crate::request::CompletionRequest::new("llama3")
          .to_chat_request("hi");
        let body = OpenAiCompatClient::new("http://x/v1", None)
          .body(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn default_wiring_sends_bare_ollama_name()
    {   let config = crate::config::ClientConfig::default();
        let registry = crate::registry::ModelRegistry::default();
        let mut request = config.to_request();
        request.model = registry.resolve(&config.model);
        let chat = request.to_chat_request("hi");
        assert_eq!(chat.model, "ollama/llama3");

        let client = OpenAiCompatClient::from_config(&config.provider)
          .unwrap();
        let json = serde_json::to_value(client.body(&chat)).unwrap();
        assert_eq!(json["model"], "llama3");

        let json = serde_json::to_value(
          OpenAiCompatClient::ollama().body(&chat)
        ).unwrap();
        assert_eq!(json["model"], "llama3");
    }

    #[test]
    fn no_routing_prefix_sends_name_unchanged()
    {   let client = OpenAiCompatClient::new("http://x/v1", None);
        assert_eq!(client.wire_model("ollama/llama3"), "ollama/llama3");
        let client = client.with_routing_prefix(Some(""));
        assert_eq!(client.wire_model("ollama/llama3"), "ollama/llama3");
        let client = client.with_routing_prefix(Some("ollama/"));
        assert_eq!(client.wire_model("mistral"), "mistral");
    }

    #[test]
    fn trailing_slash_is_trimmed()
    {   let client = OpenAiCompatClient::new(
          "http://localhost:8000/v1/", None
        );
        assert_eq!(client.api_base(), "http://localhost:8000/v1");
    }
}
