use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_GENERATION_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
pub const DEFAULT_RESOLUTION: &str = "720p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShotId(pub Uuid);

impl ShotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Settings the downstream video generator uses for every drafted shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model: String,
    pub aspect_ratio: String,
    pub resolution: String,
}

impl Default for GenerationMetadata {
    fn default() -> Self {
        Self {
            model: DEFAULT_GENERATION_MODEL.to_string(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
        }
    }
}

/// Text produced by the analysis service for one start/end pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotAnalysisFields {
    pub topic: String,
    pub visual_analysis: String,
    pub action_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub id: ShotId,
    /// Position in the project's sequence. Assigned once, never rewritten.
    pub sequence_order: u32,
    pub topic: String,
    pub visual_analysis: String,
    pub action_prompt: String,
    /// Start frame as a data URL.
    pub source_image: String,
    /// End frame as a data URL.
    pub target_image: String,
    pub generation: GenerationMetadata,
    pub created_at: i64,
}

impl Shot {
    pub fn new(
        sequence_order: u32,
        fields: ShotAnalysisFields,
        source_image: String,
        target_image: String,
        generation: GenerationMetadata,
    ) -> Self {
        Self {
            id: ShotId::new(),
            sequence_order,
            topic: fields.topic,
            visual_analysis: fields.visual_analysis,
            action_prompt: fields.action_prompt,
            source_image,
            target_image,
            generation,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Label used in listings, e.g. `#007 Harbour at dawn`.
    pub fn label(&self) -> String {
        format!("#{:03} {}", self.sequence_order, self.topic)
    }
}
