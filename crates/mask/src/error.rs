use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Invalid RLE: {0}")]
    InvalidRle(String),

    #[error("Unsupported segmentation: {0}")]
    UnsupportedSegmentation(String),

    #[error("Mask size mismatch: expected {expected_width}x{expected_height}, found {width}x{height}")]
    SizeMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;
