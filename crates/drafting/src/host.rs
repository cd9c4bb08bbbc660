//! Callbacks through which the drafting panel talks to whoever owns the
//! project.

use crate::DraftingError;
use parking_lot::{Mutex, RwLock};
use project::{Project, ProjectUpdate};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{info, warn};

pub trait PanelHost: Send + Sync {
    /// Current project snapshot.
    fn project(&self) -> Project;

    fn update_project(&self, update: ProjectUpdate);

    /// Advisory busy flag; other mutating actions are expected to check it.
    fn set_busy(&self, busy: bool);

    fn report_error(&self, error: &DraftingError, context: &str);

    fn navigate_to_export(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub context: String,
    pub message: String,
}

/// Host that keeps the project in memory and records every callback.
#[derive(Default)]
pub struct InMemoryHost {
    project: RwLock<Project>,
    busy: AtomicBool,
    busy_transitions: Mutex<Vec<bool>>,
    errors: Mutex<Vec<ReportedError>>,
    export_requests: AtomicUsize,
}

impl InMemoryHost {
    pub fn new(project: Project) -> Self {
        Self {
            project: RwLock::new(project),
            ..Default::default()
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn busy_transitions(&self) -> Vec<bool> {
        self.busy_transitions.lock().clone()
    }

    pub fn errors(&self) -> Vec<ReportedError> {
        self.errors.lock().clone()
    }

    pub fn export_requests(&self) -> usize {
        self.export_requests.load(Ordering::SeqCst)
    }

    pub fn into_project(self) -> Project {
        self.project.into_inner()
    }
}

impl PanelHost for InMemoryHost {
    fn project(&self) -> Project {
        self.project.read().clone()
    }

    fn update_project(&self, update: ProjectUpdate) {
        let mut guard = self.project.write();
        let next = update.apply_to(&guard);
        *guard = next;
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
        self.busy_transitions.lock().push(busy);
    }

    fn report_error(&self, error: &DraftingError, context: &str) {
        warn!(context, "{error}");
        self.errors.lock().push(ReportedError {
            context: context.to_string(),
            message: error.to_string(),
        });
    }

    fn navigate_to_export(&self) {
        info!("export view requested");
        self.export_requests.fetch_add(1, Ordering::SeqCst);
    }
}
