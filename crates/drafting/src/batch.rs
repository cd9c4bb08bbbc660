//! Sequential batch analysis of ready plates.

use crate::analysis::{AnalysisProvider, AnalysisRequest};
use crate::host::PanelHost;
use crate::ingest::ImagePayload;
use crate::plates::{PlateId, PlateStatus, PlateStore};
use crate::DraftingError;
use project::{GenerationMetadata, ProjectUpdate, Shot, ShotId};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Context label attached to every per-plate failure report.
pub const ANALYSIS_CONTEXT: &str = "Analysis";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Plates that qualified when the batch started.
    pub attempted: usize,
    /// New shots, in creation order.
    pub created: Vec<ShotId>,
    pub failed: Vec<PlateId>,
}

impl BatchReport {
    pub fn is_noop(&self) -> bool {
        self.attempted == 0
    }
}

pub struct BatchProcessor {
    provider: Arc<dyn AnalysisProvider>,
    generation: GenerationMetadata,
}

impl BatchProcessor {
    pub fn new(provider: Arc<dyn AnalysisProvider>, generation: GenerationMetadata) -> Self {
        Self {
            provider,
            generation,
        }
    }

    pub fn provider(&self) -> &Arc<dyn AnalysisProvider> {
        &self.provider
    }

    pub fn generation(&self) -> &GenerationMetadata {
        &self.generation
    }

    /// Runs every ready, not-yet-completed plate through the provider, one at
    /// a time.
    ///
    /// Works over the plates as they were when the call started. Failures are
    /// reported to the host and leave the plate in `Error`; completed plates
    /// are purged once the whole batch is done.
    #[instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn run<H>(&self, store: &PlateStore, host: &H, style_directive: &str) -> BatchReport
    where
        H: PanelHost + ?Sized,
    {
        let queue: Vec<(PlateId, ImagePayload, ImagePayload)> = store
            .snapshot()
            .qualifying()
            .into_iter()
            .filter_map(|plate| Some((plate.id, plate.source?, plate.target?)))
            .collect();
        if queue.is_empty() {
            debug!("no plates ready for analysis");
            return BatchReport::default();
        }

        host.set_busy(true);
        let mut report = BatchReport {
            attempted: queue.len(),
            ..Default::default()
        };
        let mut sequence = host.project().next_sequence_number();
        info!(plates = queue.len(), first_sequence = ?sequence, "starting analysis batch");

        for (id, source, target) in queue {
            let Some(order) = sequence else {
                warn!(plate = %id, "no sequence number left for plate");
                store.update(|list| list.with_status(id, PlateStatus::Error));
                host.report_error(&DraftingError::SequenceExhausted, ANALYSIS_CONTEXT);
                report.failed.push(id);
                continue;
            };
            store.update(|list| list.with_status(id, PlateStatus::Processing));
            let request = AnalysisRequest {
                style_directive: style_directive.to_string(),
                source,
                target,
            };
            match self.provider.analyze(&request).await {
                Ok(analysis) => {
                    let shot = Shot::new(
                        order,
                        analysis.into(),
                        request.source.as_data_url().to_string(),
                        request.target.as_data_url().to_string(),
                        self.generation.clone(),
                    );
                    sequence = order.checked_add(1);
                    debug!(plate = %id, shot = %shot.id, order, "plate analysed");
                    report.created.push(shot.id);
                    host.update_project(ProjectUpdate::modify(move |project| {
                        project.with_shot(shot)
                    }));
                    store.update(|list| list.with_status(id, PlateStatus::Completed));
                }
                Err(err) => {
                    warn!(plate = %id, "analysis failed: {err}");
                    store.update(|list| list.with_status(id, PlateStatus::Error));
                    host.report_error(&DraftingError::from(err), ANALYSIS_CONTEXT);
                    report.failed.push(id);
                }
            }
        }

        host.set_busy(false);
        store.update(|list| list.purge_completed());
        info!(
            created = report.created.len(),
            failed = report.failed.len(),
            "analysis batch finished"
        );
        report
    }
}
