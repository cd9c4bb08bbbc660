use crate::analysis::ProviderConfig;
use crate::DraftingError;
use project::GenerationMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";
pub const ANALYSIS_MODEL_ENV: &str = "DRAFTING_ANALYSIS_MODEL";

/// Drafting table settings, stored as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftingConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Metadata stamped on every created shot.
    #[serde(default)]
    pub generation: GenerationMetadata,

    /// Style directive used when the caller gives none.
    #[serde(default)]
    pub style_directive: String,
}

impl DraftingConfig {
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_generation(mut self, generation: GenerationMetadata) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style_directive = style.into();
        self
    }

    /// Fills Gemini credentials and model from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Values already present in the config win over the environment, except
    /// the model override which always applies when set.
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let ProviderConfig::Gemini(gemini) = &mut self.provider {
            if gemini.api_key.trim().is_empty() {
                if let Some(key) = lookup(API_KEY_ENV)
                    .or_else(|| lookup(FALLBACK_API_KEY_ENV))
                    .filter(|k| !k.trim().is_empty())
                {
                    gemini.api_key = key;
                }
            }
            if let Some(model) = lookup(ANALYSIS_MODEL_ENV).filter(|m| !m.trim().is_empty()) {
                gemini.model = model;
            }
        }
        self
    }

    pub fn save(&self, path: &Path) -> Result<(), DraftingError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| DraftingError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| DraftingError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, DraftingError> {
        let json = std::fs::read_to_string(path).map_err(|source| DraftingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| DraftingError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GeminiConfig, MockConfig};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn gemini(config: &DraftingConfig) -> &GeminiConfig {
        match &config.provider {
            ProviderConfig::Gemini(cfg) => cfg,
            other => panic!("expected gemini provider, got {other:?}"),
        }
    }

    #[test]
    fn env_fills_missing_key() {
        let config = DraftingConfig::default().apply_env_with(env(&[("API_KEY", "fallback")]));
        assert_eq!(gemini(&config).api_key, "fallback");

        let config = DraftingConfig::default()
            .apply_env_with(env(&[("GEMINI_API_KEY", "primary"), ("API_KEY", "fallback")]));
        assert_eq!(gemini(&config).api_key, "primary");
    }

    #[test]
    fn configured_key_wins_over_env() {
        let config = DraftingConfig::default()
            .with_provider(ProviderConfig::Gemini(GeminiConfig {
                api_key: "from-file".to_string(),
                ..Default::default()
            }))
            .apply_env_with(env(&[
                ("GEMINI_API_KEY", "from-env"),
                ("DRAFTING_ANALYSIS_MODEL", "gemini-2.5-pro"),
            ]));
        assert_eq!(gemini(&config).api_key, "from-file");
        assert_eq!(gemini(&config).model, "gemini-2.5-pro");
    }

    #[test]
    fn mock_provider_ignores_env() {
        let config = DraftingConfig::default()
            .with_provider(ProviderConfig::Mock(MockConfig::default()))
            .apply_env_with(env(&[("GEMINI_API_KEY", "unused")]));
        assert!(matches!(config.provider, ProviderConfig::Mock(_)));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafting.json");
        let config = DraftingConfig::default().with_style("warm tungsten, 35mm");
        config.save(&path).unwrap();
        let loaded = DraftingConfig::load(&path).unwrap();
        assert_eq!(loaded.style_directive, "warm tungsten, 35mm");
        assert_eq!(loaded.generation, GenerationMetadata::default());
        assert!(matches!(loaded.provider, ProviderConfig::Gemini(_)));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config: DraftingConfig =
            serde_json::from_str(r#"{"provider":{"kind":"gemini","api_key":"k"}}"#).unwrap();
        let cfg = gemini(&config);
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.model, "gemini-2.5-flash");
        assert_eq!(cfg.timeout_secs, 60);
    }
}
