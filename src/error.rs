use std::fmt;

/// Error substrings that mark a context window overflow when
/// the transport gives no structured code for it.
const CONTEXT_OVERFLOW_MARKERS: [&str; 2]
  = ["maximum context length", "token limit"];

/// Custom error type for transport calls and client setup
/// Implements Clone so scripted transports can replay it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing for a provider
    MissingApiKey(String)
  , /// HTTP request error
    HttpError(String)
  , /// API returned an error response
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// No choices in API response
    NoChoicesInResponse
  , /// Rate limit exceeded
    RateLimitExceeded
  , /// Context window exceeded, with the provider's message
    ContextWindowExceeded(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl Error
{   /// The transport asked us to slow down
    pub fn is_rate_limit(&self) -> bool
    {   matches!(self, Error::RateLimitExceeded)
    }

    /// Whether the request can never fit the model's context.
    ///
    /// The structured variant wins; otherwise falls back to a
    /// case-insensitive match on the rendered message. Rate
    /// limits are never treated as overflow.
    pub fn is_context_overflow(&self) -> bool
    {   match self
        {   Error::ContextWindowExceeded(_) => true
          , Error::RateLimitExceeded => false
          , other => mentions_context_overflow(&other.to_string())
        }
    }
}

/// Substring heuristic over free-form error text
pub fn mentions_context_overflow(text: &str) -> bool
{   let lowered = text.to_lowercase();
    CONTEXT_OVERFLOW_MARKERS
      .iter()
      .any(|marker| lowered.contains(marker))
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoChoicesInResponse => {
              write!(f, "API response contained no choices")
            }
          , Error::RateLimitExceeded => {
              write!(f, "API rate limit exceeded")
            }
          , Error::ContextWindowExceeded(msg) => {
              write!(f,
                "Request exceeds model context window: {}",
                msg
              )
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn overflow_heuristic_ignores_case()
    {   let err = Error::ApiError(
          "This model's Maximum Context Length is 8192".to_string()
        );
        assert!(err.is_context_overflow());
        assert!(Error::from("hit the TOKEN LIMIT").is_context_overflow());
    }

    #[test]
    fn structured_overflow_needs_no_marker()
    {   let err = Error::ContextWindowExceeded("too long".to_string());
        assert!(err.is_context_overflow());
    }

    #[test]
    fn rate_limit_is_never_overflow()
    {   assert!(Error::RateLimitExceeded.is_rate_limit());
        assert!(!Error::RateLimitExceeded.is_context_overflow());
    }

    #[test]
    fn unrelated_errors_are_not_overflow()
    {   assert!(!Error::HttpError("connection reset".into())
          .is_context_overflow());
        assert!(!Error::Timeout.is_context_overflow());
    }
}
