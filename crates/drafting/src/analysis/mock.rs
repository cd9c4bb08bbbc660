use super::{AnalysisProvider, AnalysisRequest, ProviderError, ShotAnalysis};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockOutcome {
    Success(ShotAnalysis),
    Failure(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MockConfig {
    /// Outcomes returned in call order; once exhausted every call succeeds
    /// with a generated analysis.
    #[serde(default)]
    pub scripted: Vec<MockOutcome>,
}

impl MockConfig {
    pub fn scripted(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        Self {
            scripted: outcomes.into_iter().collect(),
        }
    }
}

/// Offline provider used by tests and `--mock` runs.
pub struct MockProvider {
    remaining: Mutex<VecDeque<MockOutcome>>,
    calls: AtomicUsize,
    styles: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(config: MockConfig) -> Self {
        Self {
            remaining: Mutex::new(VecDeque::from(config.scripted)),
            calls: AtomicUsize::new(0),
            styles: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Style directives seen so far, in call order.
    pub fn seen_styles(&self) -> Vec<String> {
        self.styles.lock().clone()
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "drafting-mock-analyzer"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ShotAnalysis, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.styles.lock().push(request.style_directive.clone());
        let scripted = self.remaining.lock().pop_front();
        match scripted {
            Some(MockOutcome::Success(analysis)) => Ok(analysis),
            Some(MockOutcome::Failure(msg)) => Err(ProviderError::Other(msg)),
            None => Ok(ShotAnalysis {
                topic: format!("Mock shot {call}"),
                analysis: format!(
                    "Start frame ({}) resolves into end frame ({}).",
                    request.source.mime_type(),
                    request.target.mime_type()
                ),
                prompt: if request.style_directive.trim().is_empty() {
                    "Slow push-in from the start frame to the end frame.".to_string()
                } else {
                    format!(
                        "Slow push-in from the start frame to the end frame, {}.",
                        request.style_directive.trim()
                    )
                },
            }),
        }
    }
}
