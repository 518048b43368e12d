//! # Instance Mask Library
//!
//! Binary instance masks and the COCO run-length codec used to store them in
//! annotation files.
//!
//! ## Core Features
//!
//! - **BinaryMask**: row-major pixel mask with bounding box and area helpers
//! - **COCO RLE**: column-major run-length encoding, compressed string form
//!   compatible with pycocotools
//! - **Codec trait**: swap the storage encoding behind `MaskCodec`
//! - **Image IO**: read edited masks from grayscale images and write them back
//!
//! ## Quick Start
//!
//! ```rust
//! use mask::{BinaryMask, CocoRleCodec, MaskCodec};
//!
//! let mask = BinaryMask::from_fn(64, 48, |x, y| x < 10 && y < 20);
//! let codec = CocoRleCodec;
//!
//! let segmentation = codec.encode(&mask);
//! assert_eq!(codec.decode(&segmentation)?, mask);
//! assert_eq!(mask.bounding_box(), [0, 0, 9, 19]);
//! # Ok::<(), mask::MaskError>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod rle;
pub mod codec;
pub mod io;

// Re-exports for convenience
pub use error::{MaskError, Result};
pub use types::{BinaryMask, PixelBox};
pub use traits::*;
pub use rle::{Rle, Segmentation};
pub use codec::CocoRleCodec;
