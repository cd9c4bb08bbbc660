//! Start/end frame analysis providers.
//!
//! A provider receives both frames of a plate plus the user's style
//! directive and returns the topic, visual analysis and motion prompt that
//! become a shot.
pub mod gemini;
pub mod mock;

use crate::ingest::ImagePayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::{MockConfig, MockOutcome, MockProvider};

/// Topic used when the service returns nothing usable for it.
pub const PLACEHOLDER_TOPIC: &str = "Untitled Shot";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        ProviderError::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        ProviderError::Transport(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        ProviderError::InvalidResponse(msg.into())
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub style_directive: String,
    pub source: ImagePayload,
    pub target: ImagePayload,
}

/// Structured result of one analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotAnalysis {
    pub topic: String,
    pub analysis: String,
    pub prompt: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

impl ShotAnalysis {
    /// Parses the service's JSON text. Empty text and missing fields fall
    /// back to defaults; a blank topic becomes [`PLACEHOLDER_TOPIC`].
    pub fn from_json_text(text: &str) -> Result<Self, ProviderError> {
        let body = strip_code_fence(text);
        let raw: RawAnalysis = if body.is_empty() {
            RawAnalysis::default()
        } else {
            serde_json::from_str(body).map_err(|err| {
                ProviderError::invalid_response(format!(
                    "Invalid analysis JSON: {err}; raw: {body}"
                ))
            })?
        };
        let topic = raw
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_TOPIC.to_string());
        Ok(Self {
            topic,
            analysis: raw.analysis.unwrap_or_default(),
            prompt: raw.prompt.unwrap_or_default(),
        })
    }
}

impl From<ShotAnalysis> for project::ShotAnalysisFields {
    fn from(value: ShotAnalysis) -> Self {
        Self {
            topic: value.topic,
            visual_analysis: value.analysis,
            action_prompt: value.prompt,
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model_name(&self) -> &str;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ShotAnalysis, ProviderError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    Gemini(GeminiConfig),
    Mock(MockConfig),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Gemini(GeminiConfig::default())
    }
}

pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn AnalysisProvider>, ProviderError> {
    match config {
        ProviderConfig::Gemini(cfg) => Ok(Arc::new(GeminiProvider::new(cfg.clone())?)),
        ProviderConfig::Mock(cfg) => Ok(Arc::new(MockProvider::new(cfg.clone()))),
    }
}
