//! Explicit model-name registry
//!
//! Maps user-facing model names to transport identifiers. The
//! registry is an owned value handed to client construction.

use std::collections::BTreeSet;
use log::{debug, info};

pub const OLLAMA_PREFIX: &str = "ollama/";

const KNOWN_OLLAMA_MODELS: [&str; 13] =
[   "qwen3:14b"
  , "llama3"
  , "llama2"
  , "codellama"
  , "mistral"
  , "mixtral"
  , "llava"
  , "gemma"
  , "phi3"
  , "qwen2"
  , "qwen3:14b-q4_K_M"
  , "command-r"
  , "command-r-plus"
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry
{   prefix: String
  , known: BTreeSet<String>
}

impl ModelRegistry
{   pub fn new(prefix: impl Into<String>) -> Self
    {   ModelRegistry
        {   prefix: prefix.into()
          , known: BTreeSet::new()
        }
    }

    /// Registry for a local Ollama install, seeded with
    /// the usual model tags
    pub fn ollama() -> Self
    {   let mut registry = ModelRegistry::new(OLLAMA_PREFIX);
        for name in KNOWN_OLLAMA_MODELS
        {   registry.register(name);
        }
        registry
    }

    /// Identity resolution, for endpoints that take raw names
    pub fn bare() -> Self
    {   ModelRegistry::new("")
    }

    pub fn prefix(&self) -> &str
    {   &self.prefix
    }

    pub fn register(&mut self, name: impl Into<String>)
    {   let name = name.into();
        debug!("Registering model: {}", name);
        self.known.insert(name);
    }

    pub fn is_known(&self, name: &str) -> bool
    {   let bare = name.strip_prefix(self.prefix.as_str())
          .unwrap_or(name);
        self.known.contains(bare)
    }

    /// Transport identifier for `name`. Unknown names are
    /// self-describing: resolved the same way, never stored.
    pub fn resolve(&self, name: &str) -> String
    {   if !self.is_known(name)
        {   info!("Using unregistered model name: {}", name);
        }
        if name.starts_with(self.prefix.as_str())
        {   name.to_string()
        } else
        {   format!("{}{}", self.prefix, name)
        }
    }
}

impl Default for ModelRegistry
{   fn default() -> Self
    {   ModelRegistry::ollama()
    }
}
