//! Drafting table facade: plate editing, drops, batches and project edits.

use crate::analysis::{build_provider, AnalysisProvider};
use crate::batch::{BatchProcessor, BatchReport};
use crate::config::DraftingConfig;
use crate::host::PanelHost;
use crate::ingest::{decode_images, DroppedFile};
use crate::plates::{plate_number, Column, PlateId, PlateList, PlateStore, Slot};
use crate::DraftingError;
use project::{GenerationMetadata, ProjectUpdate, ShotId};
use std::sync::Arc;
use tracing::{debug, info};

/// The drafting table: pending plates plus the batch processor, bound to a
/// host that owns the project.
pub struct DraftingTable<H: PanelHost> {
    host: Arc<H>,
    plates: PlateStore,
    processor: BatchProcessor,
}

impl<H: PanelHost> DraftingTable<H> {
    pub fn new(
        host: Arc<H>,
        provider: Arc<dyn AnalysisProvider>,
        generation: GenerationMetadata,
    ) -> Self {
        Self {
            host,
            plates: PlateStore::new(),
            processor: BatchProcessor::new(provider, generation),
        }
    }

    pub fn from_config(host: Arc<H>, config: &DraftingConfig) -> Result<Self, DraftingError> {
        let provider = build_provider(&config.provider)?;
        info!(
            provider = provider.name(),
            model = provider.model_name(),
            "drafting table ready"
        );
        Ok(Self::new(host, provider, config.generation.clone()))
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn plates(&self) -> PlateList {
        self.plates.snapshot()
    }

    pub fn add_plate(&self) -> PlateId {
        let list = self.plates.update(PlateList::with_new_plate);
        let id = list.plates()[list.len() - 1].id;
        debug!(plate = %id, "plate added");
        id
    }

    pub fn remove_plate(&self, id: PlateId) {
        self.plates.update(|list| list.without_plate(id));
    }

    pub fn clear_slot(&self, id: PlateId, slot: Slot) {
        self.plates.update(|list| list.with_cleared_image(id, slot));
    }

    /// Drop onto one slot of one plate. The first accepted image replaces
    /// that slot; returns whether anything was placed.
    pub async fn drop_on_slot(
        &self,
        id: PlateId,
        slot: Slot,
        files: &[DroppedFile],
    ) -> Result<bool, DraftingError> {
        let Some(image) = decode_images(files).await?.into_iter().next() else {
            return Ok(false);
        };
        self.plates.update(|list| list.with_image(id, slot, image));
        Ok(true)
    }

    /// Returns the number of images placed.
    pub async fn drop_on_column(
        &self,
        column: Column,
        files: &[DroppedFile],
    ) -> Result<usize, DraftingError> {
        let images = decode_images(files).await?;
        let placed = images.len();
        if placed > 0 {
            self.plates.update(|list| list.with_column(column, images));
        }
        Ok(placed)
    }

    /// Returns the number of plates created.
    pub async fn drop_mixed(&self, files: &[DroppedFile]) -> Result<usize, DraftingError> {
        let images = decode_images(files).await?;
        let created = images.len().div_ceil(2);
        if created > 0 {
            self.plates.update(|list| list.with_mixed(images));
        }
        Ok(created)
    }

    pub async fn process_batch(&self, style_directive: &str) -> BatchReport {
        self.processor
            .run(&self.plates, self.host.as_ref(), style_directive)
            .await
    }

    /// Displayed number for each pending plate, in list order.
    pub fn plate_numbers(&self) -> Vec<(PlateId, Option<u32>)> {
        let project = self.host.project();
        self.plates
            .snapshot()
            .iter()
            .enumerate()
            .map(|(index, plate)| (plate.id, plate_number(&project, index)))
            .collect()
    }

    pub fn remove_shot(&self, id: ShotId) {
        self.host
            .update_project(ProjectUpdate::modify(move |project| project.without_shot(id)));
    }

    pub fn set_starting_sequence_number(&self, start: u32) {
        self.host.update_project(ProjectUpdate::modify(move |project| {
            project.with_starting_sequence_number(start)
        }));
    }

    pub fn proceed_to_export(&self) {
        self.host.navigate_to_export();
    }
}
