use std::path::{Path, PathBuf};

use mask::{PixelBox, Segmentation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category assigned to instances created by a split
pub const DEFAULT_CATEGORY_ID: u64 = 1;

/// How the four `bbox` numbers of a record are interpreted.
///
/// Stored as the integer tag used by detectron2's `BoxMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum BoxMode {
    /// `[min_x, min_y, max_x, max_y]` in pixels
    XyxyAbs,
    /// `[x, y, width, height]` in pixels
    XywhAbs,
    /// Any other tag, kept as-is and drawn as XYXY
    Other(u8),
}

impl From<u8> for BoxMode {
    fn from(tag: u8) -> Self {
        match tag {
            0 => Self::XyxyAbs,
            1 => Self::XywhAbs,
            other => Self::Other(other),
        }
    }
}

impl From<BoxMode> for u8 {
    fn from(mode: BoxMode) -> Self {
        match mode {
            BoxMode::XyxyAbs => 0,
            BoxMode::XywhAbs => 1,
            BoxMode::Other(tag) => tag,
        }
    }
}

impl BoxMode {
    /// Convert stored bbox numbers to `[min_x, min_y, max_x, max_y]`
    pub fn to_xyxy(self, bbox: [u32; 4]) -> [u32; 4] {
        match self {
            Self::XywhAbs => [
                bbox[0],
                bbox[1],
                bbox[0].saturating_add(bbox[2]),
                bbox[1].saturating_add(bbox[3]),
            ],
            Self::XyxyAbs | Self::Other(_) => bbox,
        }
    }
}

/// One instance's stored annotation.
///
/// Fields this tool does not interpret are kept in `extra` and written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_mode: Option<BoxMode>,
    pub segmentation: Segmentation,
    pub bbox: [u32; 4],
    pub category_id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnnotationRecord {
    /// Record for a newly created instance with an absolute XYXY box
    pub fn new(segmentation: Segmentation, bbox: PixelBox, category_id: u64) -> Self {
        Self {
            bbox_mode: Some(BoxMode::XyxyAbs),
            segmentation,
            bbox,
            category_id,
            extra: Map::new(),
        }
    }

    /// Stored box as `[min_x, min_y, max_x, max_y]`
    pub fn bbox_xyxy(&self) -> [u32; 4] {
        self.bbox_mode.unwrap_or(BoxMode::XyxyAbs).to_xyxy(self.bbox)
    }
}

/// Contents of one annotation file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub annotations: Vec<AnnotationRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An (image, annotation) pair found in the dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub image_path: PathBuf,
    pub annotation_path: PathBuf,
}

impl DatasetEntry {
    pub fn new(image_path: impl Into<PathBuf>, annotation_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            annotation_path: annotation_path.into(),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn annotation_path(&self) -> &Path {
        &self.annotation_path
    }
}
