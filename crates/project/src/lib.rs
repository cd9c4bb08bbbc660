use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

mod shot;
pub use shot::*;
mod update;
pub use update::*;
mod manifest;
pub use manifest::*;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to access project file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub const DEFAULT_STARTING_SEQUENCE_NUMBER: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The shot list a drafting session appends to.
///
/// Values are never mutated in place by the drafting panel: every change is
/// expressed as a new `Project` produced from the previous one, see
/// [`ProjectUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Shots in insertion order. Display order comes from `sequence_order`.
    #[serde(default)]
    pub shots: Vec<Shot>,
    #[serde(default = "default_starting_sequence_number")]
    pub starting_sequence_number: u32,
}

fn default_starting_sequence_number() -> u32 {
    DEFAULT_STARTING_SEQUENCE_NUMBER
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project")
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            shots: Vec::new(),
            starting_sequence_number: DEFAULT_STARTING_SEQUENCE_NUMBER,
        }
    }

    /// Sequence number the next created shot receives, or `None` once the
    /// numbering has run past `u32::MAX`.
    pub fn next_sequence_number(&self) -> Option<u32> {
        let taken = u32::try_from(self.shots.len()).ok()?;
        self.starting_sequence_number.checked_add(taken)
    }

    /// Shots ordered by `sequence_order`; ties keep insertion order.
    pub fn shots_in_sequence(&self) -> Vec<&Shot> {
        let mut shots: Vec<&Shot> = self.shots.iter().collect();
        shots.sort_by_key(|shot| shot.sequence_order);
        shots
    }

    pub fn shot(&self, id: ShotId) -> Option<&Shot> {
        self.shots.iter().find(|shot| shot.id == id)
    }

    pub fn with_shot(&self, shot: Shot) -> Self {
        let mut next = self.clone();
        next.shots.push(shot);
        next
    }

    pub fn without_shot(&self, id: ShotId) -> Self {
        let mut next = self.clone();
        next.shots.retain(|shot| shot.id != id);
        next
    }

    pub fn with_starting_sequence_number(&self, start: u32) -> Self {
        let mut next = self.clone();
        next.starting_sequence_number = start;
        next
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ProjectError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let json = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ProjectError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
