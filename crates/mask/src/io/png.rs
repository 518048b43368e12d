use std::path::Path;

use tracing::debug;

use crate::{error::Result, types::BinaryMask};

impl BinaryMask {
    /// Load a mask image from file; any non-zero luma value is foreground
    pub fn load_image(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)?;
        let mask = Self::from_luma(&img.to_luma8());
        debug!(path = %path.display(), area = mask.area(), "Loaded mask image");
        Ok(mask)
    }

    /// Load a mask image from memory
    pub fn load_image_from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_luma(&img.to_luma8()))
    }

    /// Save as an 8-bit grayscale image, format chosen from the extension
    pub fn save_image(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_luma().save(path.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");

        let mask = BinaryMask::from_fn(12, 9, |x, y| x > 3 && y < 5);
        mask.save_image(&path).unwrap();

        let loaded = BinaryMask::load_image(&path).unwrap();
        assert_eq!(loaded, mask);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BinaryMask::load_image(dir.path().join("absent.png")).is_err());
    }
}
