use std::sync::Arc;
use std::time::Duration;
use log::{debug, trace, warn, error, info};
use crate::{CompletionOutcome, FailureKind};

pub const NO_CONTENT_DETAIL: &str = "no content in response";
pub const RETRIES_EXHAUSTED_DETAIL: &str
  = "failed to get response after max retries";

/// One logical completion call with bounded retry.
///
/// Cheap to clone; clones share the transport but never any
/// per-call state.
#[derive(Clone)]
pub struct CompletionClient
{   request: crate::request::CompletionRequest
  , policy: crate::retry::RetryPolicy
  , timeout: Option<Duration>
  , transport: Arc<dyn crate::transport::Transport>
}

impl std::fmt::Debug for CompletionClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("CompletionClient")
          .field("request", &self.request)
          .field("policy", &self.policy)
          .field("timeout", &self.timeout)
          .finish_non_exhaustive()
    }
}

impl CompletionClient
{   /// Create a client, failing fast on out-of-range parameters
    pub fn new(
      request: crate::request::CompletionRequest
    , policy: crate::retry::RetryPolicy
    , transport: Arc<dyn crate::transport::Transport>
    ) -> Result<Self, crate::error::Error>
    {   request.validate()?;
        policy.validate()?;
        debug!(
          "Creating CompletionClient for {} ({} attempts)",
          request.model, policy.max_attempts
        );
        Ok(CompletionClient
        {   request
          , policy
          , timeout: None
          , transport
        })
    }

    /// Build from configuration, resolving the model name
    /// through `registry`
    pub fn from_config(
      config: &crate::config::ClientConfig
    , registry: &crate::registry::ModelRegistry
    , transport: Arc<dyn crate::transport::Transport>
    ) -> Result<Self, crate::error::Error>
    {   config.validate()?;
        let mut request = config.to_request();
        request.model = registry.resolve(&config.model);
        let client = CompletionClient::new(
          request
        , config.retry.to_policy()?
        , transport
        )?;
        Ok(client.with_timeout(config.timeout()))
    }

    /// Deadline for a whole predict call, all attempts included
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self
    {   self.timeout = timeout;
        self
    }

    pub fn request(&self) -> &crate::request::CompletionRequest
    {   &self.request
    }

    pub fn policy(&self) -> &crate::retry::RetryPolicy
    {   &self.policy
    }

    /// Run the prompt to a single outcome. Never errors; every
    /// transport fault ends up inside the returned outcome.
    pub async fn predict(&self, prompt: &str) -> CompletionOutcome
    {   match self.timeout
        {   None => self.attempt_loop(prompt).await
          , Some(limit) => {
              match tokio::time::timeout(
                limit,
                self.attempt_loop(prompt)
              ).await
              {   Ok(outcome) => outcome
                , Err(_) => {
                    warn!(
                      "Deadline of {:.2}s exceeded for {}",
                      limit.as_secs_f64(), self.request.model
                    );
                    CompletionOutcome::failure(
                      FailureKind::RetriesExhausted,
                      format!(
                        "deadline of {:.2}s exceeded",
                        limit.as_secs_f64()
                      )
                    )
                  }
              }
            }
        }
    }

    async fn attempt_loop(&self, prompt: &str) -> CompletionOutcome
    {   let chat = self.request.to_chat_request(prompt);
        let mut backoff = self.policy.backoff();
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts
        {   trace!("Attempt {}/{} for {}", attempt, max_attempts, chat.model);
            match self.transport.complete(&chat).await
            {   Ok(Some(text)) => {
                  debug!("Completion succeeded on attempt {}", attempt);
                  return CompletionOutcome::Success(text);
                }
              , Ok(None) => {
                  error!("No content in response from {}", chat.model);
                  return CompletionOutcome::failure(
                    FailureKind::TransportError,
                    NO_CONTENT_DETAIL
                  );
                }
              , Err(e) if e.is_rate_limit() => {
                  let delay = backoff.next_delay();
                  warn!(
                    "Rate limited, retrying after {:.2} seconds, {}-th retry",
                    delay.as_secs_f64(), attempt
                  );
                  tokio::time::sleep(delay).await;
                }
              , Err(e) => {
                  warn!("Error in attempt {}, retrying: {}", attempt, e);
                  if attempt == max_attempts && e.is_context_overflow()
                  {   return CompletionOutcome::failure(
                        FailureKind::ContextLengthExceeded,
                        e.to_string()
                      );
                  }
                }
            }
        }

        info!("Giving up on {} after {} attempts", chat.model, max_attempts);
        CompletionOutcome::failure(
          FailureKind::RetriesExhausted,
          RETRIES_EXHAUSTED_DETAIL
        )
    }
}
