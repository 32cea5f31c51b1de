//! Configuration for the completion and ensemble clients

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::debug;

/// HTTP endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// API base URL, OpenAI-compatible
    pub api_base: String
  , /// Environment variable holding the API key, if any
    pub api_key_env: Option<String>
  , /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>
  , /// Registry prefix the endpoint does not understand;
    /// removed from model names before sending
    pub routing_prefix: Option<String>
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_base: "http://localhost:11434/v1".to_string()
          , api_key_env: None
          , timeout_secs: None
          , routing_prefix: Some(crate::registry::OLLAMA_PREFIX.to_string())
        }
    }
}

impl ProviderConfig
{   /// Read the API key from the configured variable.
    /// No variable configured means no key is needed.
    pub fn api_key(&self) -> Result<Option<String>, crate::error::Error>
    {   match &self.api_key_env
        {   None => Ok(None)
          , Some(var) => std::env::var(var)
              .map(Some)
              .map_err(|_| {
                crate::error::Error::MissingApiKey(var.clone())
              })
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Max attempts per predict call
    pub max_retries: usize
  , /// Initial backoff in milliseconds
    pub base_delay_ms: u64
  , /// Multiplier applied on every rate-limit hit
    pub exponential_base: f64
  , /// Randomize each backoff step
    pub jitter: bool
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_retries: 3
          , base_delay_ms: 2000
          , exponential_base: 2.0
          , jitter: true
        }
    }
}

impl RetryConfig
{   pub fn to_policy(&self)
      -> Result<crate::retry::RetryPolicy, crate::error::Error>
    {   crate::retry::RetryPolicy::new(
          self.max_retries
        , Duration::from_millis(self.base_delay_ms)
        , self.exponential_base
        , self.jitter
        )
    }
}

/// Full client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig
{   /// Model name as the user knows it
    pub model: String
  , /// Optional system prompt
    pub system_prompt: Option<String>
  , pub temperature: f32
  , pub max_tokens: usize
  , pub top_p: f32
  , pub retry: RetryConfig
  , /// Per-call deadline in seconds, covering all attempts
    pub timeout_secs: Option<u64>
  , /// Default ensemble size
    pub num_responses: usize
  , pub provider: ProviderConfig
}

impl Default for ClientConfig
{   fn default() -> Self
    {   ClientConfig
        {   model: "llama3".to_string()
          , system_prompt: None
          , temperature: 0.7
          , max_tokens: 2048
          , top_p: 0.95
          , retry: RetryConfig::default()
          , timeout_secs: None
          , num_responses: 3
          , provider: ProviderConfig::default()
        }
    }
}

impl ClientConfig
{   /// Parse a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str)
      -> Result<Self, crate::error::Error>
    {   let config: ClientConfig = serde_json::from_str(json)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading client config from {}", path.display());
        let raw = std::fs::read_to_string(path)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        Self::from_json_str(&raw)
    }

    /// Request template with the model name as given
    pub fn to_request(&self) -> crate::request::CompletionRequest
    {   crate::request::CompletionRequest
        {   model: self.model.clone()
          , system_prompt: self.system_prompt.clone()
          , temperature: self.temperature
          , max_tokens: self.max_tokens
          , top_p: self.top_p
        }
    }

    pub fn timeout(&self) -> Option<Duration>
    {   self.timeout_secs.map(Duration::from_secs)
    }

    /// Check every field that would otherwise fail at call time
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   self.to_request().validate()?;
        self.retry.to_policy()?;
        if self.num_responses == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "num_responses must be positive".to_string()
            ));
        }
        if self.timeout_secs == Some(0)
        {   return Err(crate::error::Error::InvalidConfiguration(
              "timeout_secs must be positive".to_string()
            ));
        }
        if self.provider.timeout_secs == Some(0)
        {   return Err(crate::error::Error::InvalidConfiguration(
              "provider.timeout_secs must be positive".to_string()
            ));
        }
        Ok(())
    }
}
