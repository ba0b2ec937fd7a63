//! Content transformation seam
//!
//! Rewriting and illustration are delegated to an external generative
//! service; the core only knows this trait.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::RewriteVariant;

/// Target length of a rewrite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthProfile {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for LengthProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(format!("unknown length profile '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

#[async_trait]
pub trait ContentTransform: Send + Sync {
    /// Stylistic rewrites of `text`, best first
    async fn rewrite(&self, text: &str, length: LengthProfile) -> Result<Vec<RewriteVariant>>;

    /// Short description of an illustration for `text`
    async fn visual_prompt(&self, text: &str) -> Result<String>;

    /// Generate an image; returns a `data:` URL or an http(s) URL
    async fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String>;
}
