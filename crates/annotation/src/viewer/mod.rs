//! Rendering boundary.
//!
//! The session never touches viewer state directly: it builds a [`ViewModel`]
//! after every change and hands it to a [`Viewer`], which owns whatever
//! windows, layers or files it draws into.

pub mod preview;

pub use preview::PreviewViewer;

use image::RgbImage;
use mask::BinaryMask;

use crate::{
    display::DisplayGeometry,
    error::Result,
    label_map::LabelMap,
    types::DatasetEntry,
};

pub const LABELS_LAYER: &str = "labels";
pub const BOXES_LAYER: &str = "bboxes";
pub const IMAGE_LAYER: &str = "image";

/// A named overlay with its visibility
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<T> {
    pub name: &'static str,
    pub visible: bool,
    pub data: T,
}

/// The mask currently being edited during a split
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLayer<'a> {
    /// Index of the draft among the new instances
    pub index: usize,
    /// Number of new instances being drawn
    pub total: usize,
    /// Instance the drafts will replace
    pub instance_id: usize,
    pub mask: &'a BinaryMask,
}

impl DraftLayer<'_> {
    pub fn name(&self) -> String {
        format!("temp_label_{}", self.index)
    }
}

/// Everything a viewer draws for one state of the session
#[derive(Debug, Clone)]
pub struct ViewModel<'a> {
    pub entry: &'a DatasetEntry,
    /// Position of `entry` in the dataset
    pub position: usize,
    pub dataset_len: usize,
    pub image: &'a RgbImage,
    pub labels: Layer<LabelMap>,
    pub boxes: Layer<DisplayGeometry>,
    pub draft: Option<DraftLayer<'a>>,
}

/// Something that can display a [`ViewModel`] and hand back edited drafts
pub trait Viewer {
    /// Show the given state, replacing whatever was shown before
    fn present(&mut self, view: &ViewModel<'_>) -> Result<()>;

    /// The draft layer as edited by the user, if the viewer supports editing
    fn read_draft(&mut self) -> Result<Option<BinaryMask>> {
        Ok(None)
    }
}

impl<V: Viewer + ?Sized> Viewer for Box<V> {
    fn present(&mut self, view: &ViewModel<'_>) -> Result<()> {
        (**self).present(view)
    }

    fn read_draft(&mut self) -> Result<Option<BinaryMask>> {
        (**self).read_draft()
    }
}

/// Viewer that draws nothing, for scripted edits
#[derive(Debug, Clone, Copy, Default)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn present(&mut self, _view: &ViewModel<'_>) -> Result<()> {
        Ok(())
    }
}
