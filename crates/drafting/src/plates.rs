//! Pending plates: the ordered start/end pairs waiting to become shots.

use crate::ingest::ImagePayload;
use parking_lot::RwLock;
use project::Project;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlateId(Uuid);

impl PlateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlateStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

impl PlateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlateStatus::Idle => "idle",
            PlateStatus::Processing => "processing",
            PlateStatus::Completed => "completed",
            PlateStatus::Error => "error",
        }
    }
}

/// Role of an image within a plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Start frame.
    Source,
    /// End frame.
    Target,
}

/// Drop column for batch placement. Alpha feeds sources, beta feeds targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Alpha,
    Beta,
}

impl Column {
    pub fn slot(self) -> Slot {
        match self {
            Column::Alpha => Slot::Source,
            Column::Beta => Slot::Target,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    pub id: PlateId,
    pub source: Option<ImagePayload>,
    pub target: Option<ImagePayload>,
    pub status: PlateStatus,
}

impl Plate {
    pub fn empty() -> Self {
        Self {
            id: PlateId::new(),
            source: None,
            target: None,
            status: PlateStatus::Idle,
        }
    }

    pub fn with_image(slot: Slot, image: ImagePayload) -> Self {
        let mut plate = Self::empty();
        plate.set_image(slot, Some(image));
        plate
    }

    pub fn image(&self, slot: Slot) -> Option<&ImagePayload> {
        match slot {
            Slot::Source => self.source.as_ref(),
            Slot::Target => self.target.as_ref(),
        }
    }

    pub fn set_image(&mut self, slot: Slot, image: Option<ImagePayload>) {
        match slot {
            Slot::Source => self.source = image,
            Slot::Target => self.target = image,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    pub fn has_any_image(&self) -> bool {
        self.source.is_some() || self.target.is_some()
    }

    /// Ready and not yet turned into a shot.
    pub fn qualifies_for_batch(&self) -> bool {
        self.is_ready() && self.status != PlateStatus::Completed
    }
}

/// Immutable snapshot of the pending plates. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateList {
    pub(crate) plates: Vec<Plate>,
}

impl Default for PlateList {
    fn default() -> Self {
        Self::new()
    }
}

impl PlateList {
    pub fn new() -> Self {
        Self {
            plates: vec![Plate::empty()],
        }
    }

    /// Empty input collapses to a single empty plate.
    pub(crate) fn from_plates(plates: Vec<Plate>) -> Self {
        if plates.is_empty() {
            Self::new()
        } else {
            Self { plates }
        }
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plate> {
        self.plates.iter()
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn get(&self, id: PlateId) -> Option<&Plate> {
        self.plates.iter().find(|plate| plate.id == id)
    }

    pub fn position(&self, id: PlateId) -> Option<usize> {
        self.plates.iter().position(|plate| plate.id == id)
    }

    pub fn with_new_plate(&self) -> Self {
        let mut plates = self.plates.clone();
        plates.push(Plate::empty());
        Self { plates }
    }

    /// Removing the last plate leaves one fresh empty plate behind.
    pub fn without_plate(&self, id: PlateId) -> Self {
        let plates = self
            .plates
            .iter()
            .filter(|plate| plate.id != id)
            .cloned()
            .collect();
        Self::from_plates(plates)
    }

    pub fn with_image(&self, id: PlateId, slot: Slot, image: ImagePayload) -> Self {
        self.map_plate(id, |plate| plate.set_image(slot, Some(image)))
    }

    pub fn with_cleared_image(&self, id: PlateId, slot: Slot) -> Self {
        self.map_plate(id, |plate| plate.set_image(slot, None))
    }

    pub fn with_status(&self, id: PlateId, status: PlateStatus) -> Self {
        self.map_plate(id, |plate| plate.status = status)
    }

    pub fn with_statuses(&self, ids: &[PlateId], status: PlateStatus) -> Self {
        let plates = self
            .plates
            .iter()
            .map(|plate| {
                let mut plate = plate.clone();
                if ids.contains(&plate.id) {
                    plate.status = status;
                }
                plate
            })
            .collect();
        Self { plates }
    }

    pub fn purge_completed(&self) -> Self {
        let plates = self
            .plates
            .iter()
            .filter(|plate| plate.status != PlateStatus::Completed)
            .cloned()
            .collect();
        Self::from_plates(plates)
    }

    pub fn qualifying(&self) -> Vec<Plate> {
        self.plates
            .iter()
            .filter(|plate| plate.qualifies_for_batch())
            .cloned()
            .collect()
    }

    fn map_plate(&self, id: PlateId, f: impl FnOnce(&mut Plate)) -> Self {
        let mut plates = self.plates.clone();
        if let Some(plate) = plates.iter_mut().find(|plate| plate.id == id) {
            f(plate);
        }
        Self { plates }
    }
}

/// Number shown on the plate at `index`: where it would land if completed now.
/// `None` when that number would not fit in a `u32`.
pub fn plate_number(project: &Project, index: usize) -> Option<u32> {
    let offset = u32::try_from(index).ok()?;
    project.next_sequence_number()?.checked_add(offset)
}

struct Versioned {
    version: u64,
    list: PlateList,
}

/// Shared holder of the current [`PlateList`].
///
/// Every change swaps in a whole new list under the write lock and bumps the
/// version, so readers only ever see complete snapshots.
pub struct PlateStore {
    inner: RwLock<Versioned>,
}

impl Default for PlateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlateStore {
    pub fn new() -> Self {
        Self::with_list(PlateList::new())
    }

    pub fn with_list(list: PlateList) -> Self {
        Self {
            inner: RwLock::new(Versioned { version: 0, list }),
        }
    }

    pub fn snapshot(&self) -> PlateList {
        self.inner.read().list.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Replaces the list with `f(current)` and returns the new snapshot.
    pub fn update(&self, f: impl FnOnce(&PlateList) -> PlateList) -> PlateList {
        let mut guard = self.inner.write();
        let next = f(&guard.list);
        guard.list = next.clone();
        guard.version += 1;
        next
    }
}
