use crate::{GenerationMetadata, Project, ProjectError, ShotId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shot list handed to the export view, in sequence order.
///
/// Images are left out; the manifest is meant for review and for feeding the
/// video generator one prompt at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotListManifest {
    pub project_name: String,
    pub exported_at: String,
    pub starting_sequence_number: u32,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: ShotId,
    pub sequence_order: u32,
    pub topic: String,
    pub visual_analysis: String,
    pub action_prompt: String,
    pub generation: GenerationMetadata,
}

impl ShotListManifest {
    pub fn from_project(project: &Project) -> Self {
        let entries = project
            .shots_in_sequence()
            .into_iter()
            .map(|shot| ManifestEntry {
                id: shot.id,
                sequence_order: shot.sequence_order,
                topic: shot.topic.clone(),
                visual_analysis: shot.visual_analysis.clone(),
                action_prompt: shot.action_prompt.clone(),
                generation: shot.generation.clone(),
            })
            .collect();
        Self {
            project_name: project.name.clone(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            starting_sequence_number: project.starting_sequence_number,
            entries,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), ProjectError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ProjectError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Shot, ShotAnalysisFields};

    #[test]
    fn entries_follow_sequence_order() {
        let mk = |order: u32, topic: &str| {
            Shot::new(
                order,
                ShotAnalysisFields {
                    topic: topic.to_string(),
                    ..Default::default()
                },
                "data:image/png;base64,AA==".to_string(),
                "data:image/png;base64,AA==".to_string(),
                GenerationMetadata::default(),
            )
        };
        let project = Project::new("Reel")
            .with_shot(mk(2, "later"))
            .with_shot(mk(1, "earlier"));
        let manifest = ShotListManifest::from_project(&project);
        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(manifest.entries[0].topic, "earlier");
        assert_eq!(manifest.entries[1].sequence_order, 2);

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json["entries"][0].get("source_image").is_none());
    }
}
