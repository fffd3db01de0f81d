//! Retrieval and answer synthesis

mod engine;
mod prompt;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub use engine::QueryEngine;
pub use prompt::PromptTemplate;

/// How retrieved chunks are turned into an answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Pack chunks into as few prompts as fit the context window
    #[default]
    Compact,
    /// One LLM call per chunk, refining the running answer
    Refine,
    /// Retrieval only
    NoText,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Refine => "refine",
            Self::NoText => "no_text",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "compact" => Ok(Self::Compact),
            "refine" => Ok(Self::Refine),
            "no_text" => Ok(Self::NoText),
            other => Err(Error::config(format!(
                "Unknown response mode '{}' (expected compact, refine or no_text)",
                other
            ))),
        }
    }
}
