//! File intake: turns dropped or picked files into embeddable image payloads
//! and places them onto the pending plate list.

use crate::plates::{Column, Plate, PlateList};
use crate::DraftingError;
use base64::Engine;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A self-contained image: `data:<mime>;base64,<body>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImagePayload(Arc<str>);

impl ImagePayload {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        let body = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(Arc::from(format!("data:{mime_type};base64,{body}")))
    }

    /// Accepts only base64 data URLs.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (mime, _) = rest.split_once(";base64,")?;
        if mime.is_empty() {
            return None;
        }
        Some(Self(Arc::from(url)))
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> &str {
        self.parts().map(|(mime, _)| mime).unwrap_or(FALLBACK_MIME)
    }

    pub fn base64_body(&self) -> &str {
        self.parts().map(|(_, body)| body).unwrap_or_default()
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.base64_body())
    }

    fn parts(&self) -> Option<(&str, &str)> {
        self.0.strip_prefix("data:")?.split_once(";base64,")
    }
}

impl std::fmt::Display for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} image ({} b64 chars)", self.mime_type(), self.base64_body().len())
    }
}

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// One entry of a picker selection or drop event.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    name: String,
    mime_type: String,
    source: FileSource,
}

impl DroppedFile {
    /// MIME type is guessed from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_guess::from_path(&path)
            .first_raw()
            .unwrap_or(FALLBACK_MIME)
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            mime_type,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: FileSource::Memory(Arc::from(bytes)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Path(path) => Some(path),
            FileSource::Memory(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub async fn decode(&self) -> Result<ImagePayload, DraftingError> {
        match &self.source {
            FileSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| DraftingError::Decode {
                        name: self.name.clone(),
                        source,
                    })?;
                Ok(ImagePayload::from_bytes(&self.mime_type, &bytes))
            }
            FileSource::Memory(bytes) => Ok(ImagePayload::from_bytes(&self.mime_type, bytes)),
        }
    }
}

/// Decodes every image-typed file concurrently, in input order.
///
/// Non-image files are dropped without error. The first decode failure aborts
/// the whole drop so no placement sees a partial result.
pub async fn decode_images(files: &[DroppedFile]) -> Result<Vec<ImagePayload>, DraftingError> {
    let accepted: Vec<&DroppedFile> = files
        .iter()
        .filter(|file| {
            if !file.is_image() {
                debug!(name = file.name(), mime = file.mime_type(), "ignoring non-image file");
            }
            file.is_image()
        })
        .collect();
    try_join_all(accepted.into_iter().map(|file| file.decode())).await
}

impl PlateList {
    /// Column drop: image `i` lands on plate `i`, overflow appends new plates
    /// holding only that column's image.
    pub fn with_column(&self, column: Column, images: Vec<ImagePayload>) -> Self {
        let slot = column.slot();
        let mut plates = self.plates.clone();
        for (index, image) in images.into_iter().enumerate() {
            match plates.get_mut(index) {
                Some(plate) => plate.set_image(slot, Some(image)),
                None => plates.push(Plate::with_image(slot, image)),
            }
        }
        Self::from_plates(plates)
    }

    /// Mixed drop: consecutive images become source/target pairs appended
    /// after every plate that already holds an image. Empty plates are
    /// discarded. An odd trailing image gets an empty target.
    pub fn with_mixed(&self, images: Vec<ImagePayload>) -> Self {
        if images.is_empty() {
            return self.clone();
        }
        let mut plates: Vec<Plate> = self
            .plates
            .iter()
            .filter(|plate| plate.has_any_image())
            .cloned()
            .collect();
        let mut images = images.into_iter();
        while let Some(source) = images.next() {
            let mut plate = Plate::empty();
            plate.source = Some(source);
            plate.target = images.next();
            plates.push(plate);
        }
        Self::from_plates(plates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plates::Slot;

    fn png(tag: u8) -> ImagePayload {
        ImagePayload::from_bytes("image/png", &[tag])
    }

    #[test]
    fn payload_round_trips_parts() {
        let payload = ImagePayload::from_bytes("image/jpeg", b"frame");
        assert!(payload.as_data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(payload.mime_type(), "image/jpeg");
        assert_eq!(payload.decode_bytes().unwrap(), b"frame");
    }

    #[test]
    fn from_data_url_rejects_plain_urls() {
        assert!(ImagePayload::from_data_url("https://example.com/a.png").is_none());
        assert!(ImagePayload::from_data_url("data:;base64,AA==").is_none());
        assert!(ImagePayload::from_data_url("data:image/png;base64,AA==").is_some());
    }

    #[test]
    fn from_path_guesses_mime() {
        assert_eq!(DroppedFile::from_path("/tmp/a.png").mime_type(), "image/png");
        assert!(DroppedFile::from_path("/tmp/b.JPG").is_image());
        assert!(!DroppedFile::from_path("/tmp/notes.txt").is_image());
        assert!(!DroppedFile::from_path("/tmp/noext").is_image());
    }

    #[tokio::test]
    async fn decode_filters_non_images_and_keeps_order() {
        let files = vec![
            DroppedFile::from_bytes("a.png", "image/png", vec![1]),
            DroppedFile::from_bytes("readme.txt", "text/plain", vec![2]),
            DroppedFile::from_bytes("b.webp", "image/webp", vec![3]),
        ];
        let payloads = decode_images(&files).await.unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].decode_bytes().unwrap(), vec![1]);
        assert_eq!(payloads[1].mime_type(), "image/webp");
    }

    #[tokio::test]
    async fn decode_failure_aborts_drop() {
        let files = vec![
            DroppedFile::from_bytes("a.png", "image/png", vec![1]),
            DroppedFile::from_path("/definitely/missing/frame.png"),
        ];
        let err = decode_images(&files).await.unwrap_err();
        assert!(matches!(err, DraftingError::Decode { ref name, .. } if name == "frame.png"));
    }

    #[tokio::test]
    async fn decode_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("start.png");
        std::fs::write(&path, [7u8, 8, 9]).unwrap();
        let payloads = decode_images(&[DroppedFile::from_path(&path)]).await.unwrap();
        assert_eq!(payloads[0].decode_bytes().unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn column_fills_existing_then_appends() {
        let list = PlateList::new().with_new_plate();
        let next = list.with_column(Column::Beta, vec![png(1), png(2), png(3), png(4)]);
        assert_eq!(next.len(), 4);
        for (i, plate) in next.iter().enumerate() {
            assert_eq!(plate.target, Some(png(i as u8 + 1)));
            assert!(plate.source.is_none());
        }
        assert_eq!(next.plates()[0].id, list.plates()[0].id);
        assert_eq!(next.plates()[1].id, list.plates()[1].id);
    }

    #[test]
    fn column_shorter_than_list_keeps_tail() {
        let list = PlateList::new().with_new_plate().with_new_plate();
        let next = list.with_column(Column::Alpha, vec![png(1)]);
        assert_eq!(next.len(), 3);
        assert_eq!(next.plates()[0].source, Some(png(1)));
        assert!(next.plates()[1].source.is_none());
        assert!(next.plates()[2].source.is_none());
    }

    #[test]
    fn column_keeps_status_and_opposite_field() {
        let list = PlateList::new();
        let id = list.plates()[0].id;
        let list = list
            .with_image(id, Slot::Target, png(9))
            .with_status(id, crate::PlateStatus::Error);
        let next = list.with_column(Column::Alpha, vec![png(1)]);
        let plate = &next.plates()[0];
        assert_eq!(plate.source, Some(png(1)));
        assert_eq!(plate.target, Some(png(9)));
        assert_eq!(plate.status, crate::PlateStatus::Error);
    }

    #[test]
    fn mixed_pairs_consecutive_images() {
        let list = PlateList::new();
        let next = list.with_mixed(vec![png(1), png(2), png(3), png(4), png(5)]);
        assert_eq!(next.len(), 3);
        assert_eq!(next.plates()[0].source, Some(png(1)));
        assert_eq!(next.plates()[0].target, Some(png(2)));
        assert_eq!(next.plates()[1].source, Some(png(3)));
        assert_eq!(next.plates()[1].target, Some(png(4)));
        assert_eq!(next.plates()[2].source, Some(png(5)));
        assert!(next.plates()[2].target.is_none());
    }

    #[test]
    fn mixed_preserves_partial_plates_and_drops_empty() {
        let list = PlateList::new().with_new_plate().with_new_plate();
        let kept = list.plates()[1].id;
        let list = list.with_image(kept, Slot::Target, png(9));
        let next = list.with_mixed(vec![png(1), png(2)]);
        assert_eq!(next.len(), 2);
        assert_eq!(next.plates()[0].id, kept);
        assert_eq!(next.plates()[1].source, Some(png(1)));
        assert_eq!(next.plates()[1].target, Some(png(2)));
    }

    #[test]
    fn mixed_without_images_is_noop() {
        let list = PlateList::new().with_new_plate();
        assert_eq!(list.with_mixed(Vec::new()), list);
    }
}
