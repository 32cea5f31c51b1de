//! Request types shared by clients and transports

use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::User, content: content.into() }
    }
}

/// What a transport receives for one attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: usize
  , pub top_p: f32
}

/// Per-client request template: everything except the prompt
/// is fixed at construction and reused across predict calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest
{   /// Transport model identifier, already normalized
    pub model: String
  , /// Optional system instruction sent before the prompt
    pub system_prompt: Option<String>
  , /// Sampling temperature in [0, 2]
    pub temperature: f32
  , /// Max tokens to generate
    pub max_tokens: usize
  , /// Nucleus sampling mass in (0, 1]
    pub top_p: f32
}

impl CompletionRequest
{   pub fn new(model: impl Into<String>) -> Self
    {   CompletionRequest
        {   model: model.into()
          , system_prompt: None
          , temperature: 0.7
          , max_tokens: 2048
          , top_p: 0.95
        }
    }

    pub fn with_system_prompt(
      mut self
    , system_prompt: impl Into<String>
    ) -> Self
    {   self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Reject sampling parameters outside their declared ranges
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "model identifier is empty".to_string()
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature)
        {   return Err(crate::error::Error::InvalidConfiguration(
              format!("temperature {} not in [0, 2]", self.temperature)
            ));
        }
        if self.max_tokens == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "max_tokens must be positive".to_string()
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0)
        {   return Err(crate::error::Error::InvalidConfiguration(
              format!("top_p {} not in (0, 1]", self.top_p)
            ));
        }
        Ok(())
    }

    /// System message first (if any), then the user prompt
    pub fn messages(&self, prompt: &str) -> Vec<ChatMessage>
    {   let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt
        {   messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }

    pub fn to_chat_request(&self, prompt: &str) -> ChatRequest
    {   ChatRequest
        {   model: self.model.clone()
          , messages: self.messages(prompt)
          , temperature: self.temperature
          , max_tokens: self.max_tokens
          , top_p: self.top_p
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn system_message_comes_first()
    {   let request = CompletionRequest::new("ollama/llama3")
          .with_system_prompt("be brief");
        let messages = request.messages("hi");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("be brief"));
        assert_eq!(messages[1], ChatMessage::user("hi"));
    }

    #[test]
    fn no_system_message_by_default()
    {   let chat = CompletionRequest::new("m").to_chat_request("hi");
        assert_eq!(chat.messages, vec![ChatMessage::user("hi")]);
        assert_eq!(chat.max_tokens, 2048);
    }

    #[test]
    fn rejects_out_of_range_sampling()
    {   let mut request = CompletionRequest::new("m");
        request.temperature = 2.5;
        assert!(request.validate().is_err());

        let mut request = CompletionRequest::new("m");
        request.top_p = 0.0;
        assert!(request.validate().is_err());

        let mut request = CompletionRequest::new("m");
        request.max_tokens = 0;
        assert!(request.validate().is_err());

        assert!(CompletionRequest::new("m").validate().is_ok());
    }

    #[test]
    fn roles_serialize_lowercase()
    {   let json = serde_json::to_string(&ChatMessage::user("x"))
          .unwrap();
        assert_eq!(json, r#"{"role":"user","content":"x"}"#);
    }
}
