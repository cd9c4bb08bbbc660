//! Drafting table: pairs start/end reference plates, runs each ready pair
//! through an analysis provider and appends the results to a project's shot
//! list.

use std::path::PathBuf;
use thiserror::Error;

pub mod analysis;
pub mod batch;
pub mod config;
pub mod host;
pub mod ingest;
pub mod panel;
pub mod plates;

pub use analysis::{AnalysisProvider, AnalysisRequest, ProviderError, ShotAnalysis};
pub use batch::{BatchProcessor, BatchReport, ANALYSIS_CONTEXT};
pub use config::DraftingConfig;
pub use host::{InMemoryHost, PanelHost};
pub use ingest::{decode_images, DroppedFile, ImagePayload};
pub use panel::DraftingTable;
pub use plates::{Column, Plate, PlateId, PlateList, PlateStatus, PlateStore, Slot};

#[derive(Debug, Error)]
pub enum DraftingError {
    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("analysis failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("no shot sequence numbers left; lower the starting number")]
    SequenceExhausted,
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
