//! # Instance Annotation Library
//!
//! Correct mask-based instance annotations one image at a time: load an image
//! with its annotation file, derive the label map and box overlay, split one
//! instance into several new ones and write the file back.
//!
//! ## Core Features
//!
//! - **AnnotationStore**: decoded masks and records for one image, with
//!   transactional `update_instance`
//! - **DatasetCursor**: ordered (image, annotation) pairs with clamped navigation
//! - **Session**: idle/labeling state machine driving the split workflow
//! - **Viewer boundary**: plain view models handed to a renderer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use annotation::{AnnotationStore, BinaryMask};
//!
//! let mut store = AnnotationStore::load("dataset/a.png", "dataset/a.json")?;
//! let labels = store.label_map();
//! println!("{} instances, pixel (0, 0) -> {:?}", store.n_labels(), labels.instance_at(0, 0));
//!
//! // split instance 0 into two halves
//! let source = store.instance_masks()[0].clone();
//! let mid = source.width() / 2;
//! let left = BinaryMask::from_fn(source.width(), source.height(), |x, y| x < mid && source.get(x, y));
//! let right = BinaryMask::from_fn(source.width(), source.height(), |x, y| x >= mid && source.get(x, y));
//! store.update_instance(0, &[left, right])?;
//! # Ok::<(), annotation::AnnotationError>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod label_map;
pub mod display;
pub mod store;
pub mod dataset;
pub mod session;
pub mod viewer;

// Re-exports for convenience
pub use error::{AnnotationError, ErrorKind, Result};
pub use types::{AnnotationDocument, AnnotationRecord, BoxMode, DatasetEntry, DEFAULT_CATEGORY_ID};
pub use label_map::LabelMap;
pub use display::{BoxStyle, DisplayGeometry, TextAnchor, TextStyle};
pub use store::AnnotationStore;
pub use dataset::{discover, DatasetCursor, DiscoveryOptions};
pub use session::{LabelingState, Mode, Session, SessionCommand};
pub use viewer::{DraftLayer, Layer, NullViewer, PreviewViewer, ViewModel, Viewer};

pub use mask::{BinaryMask, CocoRleCodec, MaskCodec, Segmentation};
