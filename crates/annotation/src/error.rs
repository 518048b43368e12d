use std::path::PathBuf;

use strum::{Display, IntoStaticStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load image {}: {source}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save image {}: {source}", .path.display())]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Malformed annotation file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Annotation {index} in {} cannot be decoded: {source}", .path.display())]
    Segmentation {
        path: PathBuf,
        index: usize,
        #[source]
        source: mask::MaskError,
    },

    #[error("Mask error: {0}")]
    Mask(#[from] mask::MaskError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Instance {instance_id} out of range, image has {n_labels} instances")]
    InstanceOutOfRange { instance_id: usize, n_labels: usize },

    #[error("Dataset entry {index} out of range, dataset has {len} entries")]
    EntryOutOfRange { index: usize, len: usize },

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Command `{command}` is not available while {mode}")]
    InvalidCommand {
        command: &'static str,
        mode: &'static str,
    },
}

/// Coarse error taxonomy surfaced to front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A path could not be read or written
    Io,
    /// Annotation content is malformed or a mask cannot be decoded
    Format,
    /// An instance or entry index is out of range
    Index,
    /// Discovery found no entries
    EmptyDataset,
    /// The command does not apply to the current interaction mode
    State,
}

impl AnnotationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. }
            | Self::Write { .. }
            | Self::ImageLoad { .. }
            | Self::ImageSave { .. }
            | Self::Walk(_) => {
                ErrorKind::Io
            }
            Self::Mask(mask::MaskError::Io(_)) | Self::Mask(mask::MaskError::ImageLoad(_)) => {
                ErrorKind::Io
            }
            Self::Parse { .. } | Self::Segmentation { .. } | Self::Mask(_) | Self::Serialization(_) => {
                ErrorKind::Format
            }
            Self::InstanceOutOfRange { .. } | Self::EntryOutOfRange { .. } => ErrorKind::Index,
            Self::EmptyDataset => ErrorKind::EmptyDataset,
            Self::InvalidCommand { .. } => ErrorKind::State,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
