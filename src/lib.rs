pub mod error;
pub mod config;
pub mod request;
pub mod retry;
pub mod registry;
pub mod transport;
pub mod providers;
pub mod client;
pub mod ensemble;

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

pub use client::CompletionClient;
pub use config::ClientConfig;
pub use ensemble::EnsembleClient;
pub use error::Error;
pub use registry::ModelRegistry;
pub use request::CompletionRequest;
pub use retry::RetryPolicy;
pub use transport::Transport;

/*

rellm (Resilient LLM): a retry/backoff layer around a chat
completion endpoint, plus ensemble fan-out for voting.

rellm/
├── src/
│   ├── lib.rs          # Outcome types and re-exports
│   ├── error.rs        # Transport and configuration errors
│   ├── config.rs       # serde configuration with defaults
│   ├── request.rs      # Messages and request templates
│   ├── retry.rs        # Retry policy and compounding backoff
│   ├── registry.rs     # Model name resolution
│   ├── transport.rs    # The Transport trait
│   ├── providers/      # HTTP transports
│   ├── client.rs       # CompletionClient
│   └── ensemble.rs     # EnsembleClient
└── tests/

*/

/// Marker that prefixes every failure rendered as text
pub const SENTINEL_MARKER: &str = "[MODEL_LIMIT_REACHED]";

/// Install `env_logger` (honours `RUST_LOG`). Safe to call twice.
pub fn init_logging()
{   let _ = env_logger::try_init();
}

/// Why a predict call produced no completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FailureKind
{   /// The server kept throttling us
    RateLimited
  , /// The prompt can never fit the model
    ContextLengthExceeded
  , /// Attempts (or the deadline) ran out
    RetriesExhausted
  , /// Well-formed response without text
    TransportError
}

/// Result of one top-level predict call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum CompletionOutcome
{   Success(String)
  , Failure
    {   kind: FailureKind
      , detail: String
    }
}

impl CompletionOutcome
{   pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self
    {   CompletionOutcome::Failure { kind, detail: detail.into() }
    }

    pub fn is_success(&self) -> bool
    {   matches!(self, CompletionOutcome::Success(_))
    }

    pub fn text(&self) -> Option<&str>
    {   match self
        {   CompletionOutcome::Success(text) => Some(text)
          , CompletionOutcome::Failure { .. } => None
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind>
    {   match self
        {   CompletionOutcome::Success(_) => None
          , CompletionOutcome::Failure { kind, .. } => Some(*kind)
        }
    }
}

/// Success text as-is; failures as `[MODEL_LIMIT_REACHED] <detail>`
impl fmt::Display for CompletionOutcome
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self
        {   CompletionOutcome::Success(text) => write!(f, "{}", text)
          , CompletionOutcome::Failure { detail, .. } => {
              write!(f, "{} {}", SENTINEL_MARKER, detail)
            }
        }
    }
}

/// Outcomes of an ensemble call; index i is the i-th launch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnsembleResult
{   outcomes: Vec<CompletionOutcome>
}

impl EnsembleResult
{   pub fn new(outcomes: Vec<CompletionOutcome>) -> Self
    {   EnsembleResult { outcomes }
    }

    pub fn len(&self) -> usize
    {   self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[CompletionOutcome]
    {   &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<CompletionOutcome>
    {   self.outcomes
    }

    pub fn successes(&self) -> impl Iterator<Item = &str>
    {   self.outcomes.iter().filter_map(CompletionOutcome::text)
    }

    pub fn success_count(&self) -> usize
    {   self.successes().count()
    }

    /// Most frequent successful text; ties go to the earliest
    pub fn most_common(&self) -> Option<&str>
    {   let mut counts: HashMap<&str, usize> = HashMap::new();
        for text in self.successes()
        {   *counts.entry(text).or_insert(0) += 1;
        }
        let mut best: Option<(&str, usize)> = None;
        for text in self.successes()
        {   let count = counts[text];
            if best.map_or(true, |(_, top)| count > top)
            {   best = Some((text, count));
            }
        }
        best.map(|(text, _)| text)
    }
}

impl std::ops::Index<usize> for EnsembleResult
{   type Output = CompletionOutcome;

    fn index(&self, index: usize) -> &Self::Output
    {   &self.outcomes[index]
    }
}

impl IntoIterator for EnsembleResult
{   type Item = CompletionOutcome;
    type IntoIter = std::vec::IntoIter<CompletionOutcome>;

    fn into_iter(self) -> Self::IntoIter
    {   self.outcomes.into_iter()
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn ok(text: &str) -> CompletionOutcome
    {   CompletionOutcome::Success(text.to_string())
    }

    #[test]
    fn failures_render_with_sentinel()
    {   let outcome = CompletionOutcome::failure(
          FailureKind::RetriesExhausted,
          client::RETRIES_EXHAUSTED_DETAIL
        );
        assert_eq!(
          outcome.to_string(),
          "[MODEL_LIMIT_REACHED] failed to get response after max retries"
        );
        assert_eq!(ok("plain").to_string(), "plain");
    }

    #[test]
    fn outcome_accessors()
    {   let failed = CompletionOutcome::failure(
          FailureKind::TransportError, "x"
        );
        assert!(!failed.is_success());
        assert_eq!(failed.text(), None);
        assert_eq!(failed.failure_kind(), Some(FailureKind::TransportError));
        assert_eq!(ok("a").text(), Some("a"));
        assert_eq!(ok("a").failure_kind(), None);
    }

    #[test]
    fn most_common_prefers_majority_then_earliest()
    {   let result = EnsembleResult::new(vec![
          ok("4")
        , CompletionOutcome::failure(FailureKind::RetriesExhausted, "x")
        , ok("5")
        , ok("5")
        ]);
        assert_eq!(result.success_count(), 3);
        assert_eq!(result.most_common(), Some("5"));

        let tied = EnsembleResult::new(vec![ok("b"), ok("a")]);
        assert_eq!(tied.most_common(), Some("b"));
    }

    #[test]
    fn all_failures_have_no_majority()
    {   let result = EnsembleResult::new(vec![
          CompletionOutcome::failure(FailureKind::TransportError, "x")
        ]);
        assert_eq!(result.most_common(), None);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn outcomes_serialize_with_kind()
    {   let json = serde_json::to_string(&CompletionOutcome::failure(
          FailureKind::ContextLengthExceeded, "too long"
        )).unwrap();
        assert_eq!(
          json,
          r#"{"Failure":{"kind":"ContextLengthExceeded","detail":"too long"}}"#
        );
    }
}
