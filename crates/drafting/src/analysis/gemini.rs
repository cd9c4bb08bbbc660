use super::{AnalysisProvider, AnalysisRequest, ProviderError, ShotAnalysis};
use crate::ingest::ImagePayload;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const ANALYSIS_INSTRUCTION: &str = "You are a cinematographer drafting shots for an image-to-video generator. The first image is the START frame and the second image is the END frame of one continuous shot.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    GEMINI_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            api_base: default_api_base(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::configuration("Gemini API key is required."));
        }
        if config.model.trim().is_empty() {
            return Err(ProviderError::configuration(
                "Gemini model name is required.",
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| {
                ProviderError::configuration(format!("Failed to build HTTP client: {err}"))
            })?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model.trim()
        )
    }

    fn build_payload(&self, request: &AnalysisRequest) -> Value {
        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": compose_instruction(&request.style_directive) },
                    { "text": "START FRAME:" },
                    inline_image(&request.source),
                    { "text": "END FRAME:" },
                    inline_image(&request.target),
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        });
        if let Some(temperature) = self.config.temperature {
            payload["generationConfig"]["temperature"] = json!(temperature);
        }
        payload
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ShotAnalysis, ProviderError> {
        let payload = self.build_payload(request);
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.trim())
            .json(&payload)
            .send()
            .await
            .map_err(|err| ProviderError::transport(format!("Gemini request failed: {err}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            ProviderError::transport(format!("Read Gemini response failed: {err}"))
        })?;
        debug!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "gemini analysis response"
        );
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|err| {
            ProviderError::invalid_response(format!(
                "Invalid Gemini response JSON: {err}; raw: {body}"
            ))
        })?;
        ShotAnalysis::from_json_text(&parsed.text())
    }
}

fn compose_instruction(style_directive: &str) -> String {
    let mut prompt = String::from(ANALYSIS_INSTRUCTION);
    let style = style_directive.trim();
    if !style.is_empty() {
        prompt.push_str(&format!("\nStyle directive: {style}"));
    }
    prompt.push_str("\n\nRespond with JSON only, containing:");
    prompt.push_str("\n- topic: a short title for the shot.");
    prompt.push_str("\n- analysis: what is visible in both frames and what changes between them.");
    prompt.push_str("\n- prompt: a motion-generation prompt describing the camera movement and subject action that carry the START frame into the END frame.");
    prompt
}

fn inline_image(image: &ImagePayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type(),
            "data": image.base64_body(),
        }
    })
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topic": { "type": "STRING" },
            "analysis": { "type": "STRING" },
            "prompt": { "type": "STRING" },
        },
        "required": ["topic", "analysis", "prompt"],
    })
}

fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let msg = format!("Gemini API error: {status} - {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Authentication(msg),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(msg),
        _ => ProviderError::Transport(msg),
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    /// Text of the first candidate; empty when the service returned none.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(GeminiConfig {
            api_key: "test-key".to_string(),
            api_base: "http://localhost:9999/".to_string(),
            temperature: Some(0.4),
            ..Default::default()
        })
        .unwrap()
    }

    fn request(style: &str) -> AnalysisRequest {
        AnalysisRequest {
            style_directive: style.to_string(),
            source: ImagePayload::from_bytes("image/png", b"start"),
            target: ImagePayload::from_bytes("image/jpeg", b"end"),
        }
    }

    #[test]
    fn endpoint_uses_model() {
        assert_eq!(
            provider().endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn payload_carries_both_frames_and_schema() {
        let payload = provider().build_payload(&request("noir, rain-soaked"));
        let parts = payload["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 5);
        assert!(parts[0]["text"]
            .as_str()
            .unwrap()
            .contains("Style directive: noir, rain-soaked"));
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[4]["inlineData"]["mimeType"], "image/jpeg");
        let config = &payload["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["required"].as_array().unwrap().len(), 3);
        assert!((config["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn blank_style_is_omitted() {
        assert!(!compose_instruction("   ").contains("Style directive"));
    }

    #[test]
    fn response_text_joins_parts() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"topic\":"},{"text":"\"Pier\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), r#"{"topic":"Pier"}"#);
        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            ProviderError::Transport(_)
        ));
    }
}
