//! Fan one prompt out to several independent completions

use std::num::NonZeroUsize;
use futures::future::join_all;
use log::debug;

/// Runs N independent `CompletionClient::predict` calls for
/// the same prompt and keeps their outcomes in launch order
#[derive(Debug, Clone)]
pub struct EnsembleClient
{   client: crate::client::CompletionClient
  , num_responses: NonZeroUsize
}

impl EnsembleClient
{   pub fn new(
      client: crate::client::CompletionClient
    , num_responses: NonZeroUsize
    ) -> Self
    {   EnsembleClient { client, num_responses }
    }

    /// Ensemble size taken from `config.num_responses`
    pub fn from_config(
      config: &crate::config::ClientConfig
    , client: crate::client::CompletionClient
    ) -> Result<Self, crate::error::Error>
    {   let num_responses = NonZeroUsize::new(config.num_responses)
          .ok_or_else(|| {
            crate::error::Error::InvalidConfiguration(
              "num_responses must be positive".to_string()
            )
          })?;
        Ok(EnsembleClient::new(client, num_responses))
    }

    pub fn client(&self) -> &crate::client::CompletionClient
    {   &self.client
    }

    pub fn num_responses(&self) -> NonZeroUsize
    {   self.num_responses
    }

    /// Use the configured ensemble size
    pub async fn predict_default(&self, prompt: &str)
      -> crate::EnsembleResult
    {   self.predict(prompt, self.num_responses).await
    }

    /// All calls are built before any is polled, then joined;
    /// slot i always holds the i-th launched call.
    pub async fn predict(
      &self
    , prompt: &str
    , num_responses: NonZeroUsize
    ) -> crate::EnsembleResult
    {   debug!(
          "Launching {} completions for {}",
          num_responses, self.client.request().model
        );
        let calls = (0..num_responses.get())
          .map(|_| self.client.predict(prompt));
        let outcomes = join_all(calls).await;
        let result = crate::EnsembleResult::new(outcomes);
        debug!(
          "Ensemble finished: {}/{} succeeded",
          result.success_count(), result.len()
        );
        result
    }
}
