//! Retry policy and backoff state for rate-limited calls

use std::time::Duration;
use log::debug;
use rand::Rng;

/// Retry policy for one logical completion call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub base_delay: Duration
  , pub exponential_base: f64
  , pub jitter: bool
}

impl RetryPolicy
{   /// Create a new retry policy, rejecting unusable values
    pub fn new(
      max_attempts: usize
    , base_delay: Duration
    , exponential_base: f64
    , jitter: bool
    ) -> Result<Self, crate::error::Error>
    {   let policy = RetryPolicy
        {   max_attempts
          , base_delay
          , exponential_base
          , jitter
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.max_attempts == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "max_attempts must be at least 1".to_string()
            ));
        }
        if self.base_delay.is_zero()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "base_delay must be positive".to_string()
            ));
        }
        if !self.exponential_base.is_finite()
          || self.exponential_base <= 1.0
        {   return Err(crate::error::Error::InvalidConfiguration(
              format!(
                "exponential_base {} must be greater than 1",
                self.exponential_base
              )
            ));
        }
        Ok(())
    }

    /// Fresh backoff state for one call
    pub fn backoff(&self) -> Backoff
    {   Backoff
        {   current: self.base_delay
          , exponential_base: self.exponential_base
          , jitter: self.jitter
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy
        {   max_attempts: 3
          , base_delay: Duration::from_secs(2)
          , exponential_base: 2.0
          , jitter: true
        }
    }
}

/// Delay state that compounds across every rate-limit hit
/// inside a single call. Never reset mid-call.
#[derive(Debug, Clone)]
pub struct Backoff
{   current: Duration
  , exponential_base: f64
  , jitter: bool
}

impl Backoff
{   /// Grow the delay and return it
    pub fn next_delay(&mut self) -> Duration
    {   let sample = if self.jitter
        {   rand::thread_rng().gen::<f64>()
        } else
        {   0.0
        };
        self.advance(sample)
    }

    /// Grow the delay with an explicit jitter sample in [0, 1)
    pub fn advance(&mut self, jitter_sample: f64) -> Duration
    {   let factor = self.exponential_base * (1.0 + jitter_sample);
        let grown = self.current.as_secs_f64() * factor;
        self.current = Duration::try_from_secs_f64(grown)
          .unwrap_or(Duration::MAX);
        debug!("Backoff grew to {:.2}s", self.current.as_secs_f64());
        self.current
    }

    pub fn current(&self) -> Duration
    {   self.current
    }
}
