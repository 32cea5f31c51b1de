//! The boundary the clients call through

use async_trait::async_trait;

/// One remote completion call.
///
/// `Ok(Some(text))` is a completion, `Ok(None)` a response that
/// carried no text. `Err(Error::RateLimitExceeded)` asks the
/// caller to back off; any other error is a generic failure.
#[async_trait]
pub trait Transport: Send + Sync
{   async fn complete(
      &self
    , request: &crate::request::ChatRequest
    ) -> Result<Option<String>, crate::error::Error>;
}

