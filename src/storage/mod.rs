use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{NativeRect, Orientation};
use crate::render;

const METADATA_FILE: &str = "metadata.json";
const PROGRESS_FILE: &str = "progress.json";
const DEFAULT_DATA_SUBDIR: &str = ".local/share/meural-cropper/crops";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("crop identifier is empty")]
    MissingIdentifier,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode crop data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("crop service rejected the request: {0}")]
    Rejected(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Where crop rectangles live between sessions.
pub trait CropPersistence {
    fn fetch_crop(
        &self,
        identifier: &str,
        orientation: Orientation,
    ) -> StorageResult<Option<NativeRect>>;

    fn submit_crop(
        &self,
        identifier: &str,
        orientation: Orientation,
        rect: NativeRect,
    ) -> StorageResult<()>;

    fn discard_crops(&self, identifier: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Unprocessed,
    Portrait,
    Landscape,
    Both,
}

impl ProcessingStatus {
    /// Status after a crop for `orientation` has been stored.
    pub const fn with_crop(self, orientation: Orientation) -> Self {
        match (self, orientation) {
            (Self::Both, _) => Self::Both,
            (Self::Landscape, Orientation::Portrait) => Self::Both,
            (Self::Portrait, Orientation::Landscape) => Self::Both,
            (_, Orientation::Portrait) => Self::Portrait,
            (_, Orientation::Landscape) => Self::Landscape,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CropRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    portrait: Option<NativeRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    landscape: Option<NativeRect>,
}

impl CropRecord {
    fn get(&self, orientation: Orientation) -> Option<NativeRect> {
        match orientation {
            Orientation::Portrait => self.portrait,
            Orientation::Landscape => self.landscape,
        }
    }

    fn set(&mut self, orientation: Orientation, rect: NativeRect) {
        match orientation {
            Orientation::Portrait => self.portrait = Some(rect),
            Orientation::Landscape => self.landscape = Some(rect),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CropMetadata {
    #[serde(default)]
    crops: BTreeMap<String, CropRecord>,
}

/// JSON-file crop store: `metadata.json` for rectangles, `progress.json` for
/// per-image processing status.
///
/// With an output root attached, discarding an image also removes the JPEGs
/// rendered for it.
#[derive(Debug, Clone)]
pub struct CropStore {
    root: PathBuf,
    output_root: Option<PathBuf>,
}

impl CropStore {
    pub const fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            output_root: None,
        }
    }

    pub fn with_output_root(mut self, output_root: PathBuf) -> Self {
        self.output_root = Some(output_root);
        self
    }

    pub fn with_default_root() -> StorageResult<Self> {
        let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
        let mut root = PathBuf::from(home);
        root.push(DEFAULT_DATA_SUBDIR);
        fs::create_dir_all(&root)?;
        Ok(Self::with_root(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_identifier(identifier: &str) -> StorageResult<()> {
        if identifier.is_empty() {
            return Err(StorageError::MissingIdentifier);
        }
        Ok(())
    }

    pub fn status(&self, identifier: &str) -> StorageResult<ProcessingStatus> {
        Self::validate_identifier(identifier)?;
        Ok(self.load_progress()?.remove(identifier).unwrap_or_default())
    }

    pub fn statuses(&self) -> StorageResult<BTreeMap<String, ProcessingStatus>> {
        self.load_progress()
    }

    /// Records that the `orientation` output for `identifier` was rendered.
    pub fn mark_rendered(
        &self,
        identifier: &str,
        orientation: Orientation,
    ) -> StorageResult<ProcessingStatus> {
        Self::validate_identifier(identifier)?;
        let mut progress = self.load_progress()?;
        let status = progress.entry(identifier.to_string()).or_default();
        *status = status.with_crop(orientation);
        let status = *status;
        self.write_json(PROGRESS_FILE, &progress)?;
        tracing::info!(identifier, %orientation, ?status, "render recorded");
        Ok(status)
    }

    fn remove_rendered_outputs(&self, identifier: &str) -> StorageResult<()> {
        let Some(output_root) = &self.output_root else {
            return Ok(());
        };
        for orientation in Orientation::ALL {
            let path = render::output_path(output_root, identifier, orientation);
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "rendered output removed"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(StorageError::Io(err)),
            }
        }
        Ok(())
    }

    fn load_metadata(&self) -> StorageResult<CropMetadata> {
        load_json_or_default(&self.root.join(METADATA_FILE))
    }

    fn load_progress(&self) -> StorageResult<BTreeMap<String, ProcessingStatus>> {
        load_json_or_default(&self.root.join(PROGRESS_FILE))
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> StorageResult<()> {
        fs::create_dir_all(&self.root)?;
        let encoded = serde_json::to_vec_pretty(value)?;
        let target = self.root.join(file_name);
        let staging = self.root.join(format!(".{file_name}.tmp"));
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }
}

fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> StorageResult<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(StorageError::Io(err)),
    };
    Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
        tracing::warn!(?err, path = %path.display(), "malformed crop store file; starting empty");
        T::default()
    }))
}

impl CropPersistence for CropStore {
    fn fetch_crop(
        &self,
        identifier: &str,
        orientation: Orientation,
    ) -> StorageResult<Option<NativeRect>> {
        Self::validate_identifier(identifier)?;
        let metadata = self.load_metadata()?;
        Ok(metadata
            .crops
            .get(identifier)
            .and_then(|record| record.get(orientation))
            .filter(|rect| !rect.is_zero()))
    }

    fn submit_crop(
        &self,
        identifier: &str,
        orientation: Orientation,
        rect: NativeRect,
    ) -> StorageResult<()> {
        Self::validate_identifier(identifier)?;
        let mut metadata = self.load_metadata()?;
        metadata
            .crops
            .entry(identifier.to_string())
            .or_default()
            .set(orientation, rect);
        self.write_json(METADATA_FILE, &metadata)?;
        tracing::info!(identifier, %orientation, ?rect, "crop stored");
        Ok(())
    }

    fn discard_crops(&self, identifier: &str) -> StorageResult<()> {
        Self::validate_identifier(identifier)?;
        let mut metadata = self.load_metadata()?;
        if metadata.crops.remove(identifier).is_some() {
            self.write_json(METADATA_FILE, &metadata)?;
        }
        let mut progress = self.load_progress()?;
        if progress.remove(identifier).is_some() {
            self.write_json(PROGRESS_FILE, &progress)?;
        }
        self.remove_rendered_outputs(identifier)?;
        tracing::info!(identifier, "crop data discarded");
        Ok(())
    }
}
