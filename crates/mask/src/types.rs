use image::{GrayImage, Luma};

use crate::error::{MaskError, Result};

/// Bounding box of a mask as `[min_x, min_y, max_x, max_y]`, inclusive pixel coordinates.
pub type PixelBox = [u32; 4];

/// A binary pixel mask marking the pixels that belong to one object.
///
/// Pixels are stored row-major; `get(x, y)` addresses column `x` of row `y`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    /// Create an all-false mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Any non-zero pixel of the grayscale image is foreground
    pub fn from_luma(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] != 0)
    }

    /// Foreground pixels become 255, background 0
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255u8]) } else { Luma([0u8]) }
        })
    }

    /// Build a mask from column-major (Fortran order) pixel values, as used by COCO RLE.
    pub fn from_column_major(width: u32, height: u32, values: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(MaskError::InvalidRle(format!(
                "expected {} pixels for a {}x{} mask, got {}",
                expected, width, height, values.len()
            )));
        }

        let h = height as usize;
        Ok(Self::from_fn(width, height, |x, y| {
            values[y as usize + h * x as usize] != 0
        }))
    }

    /// Pixel values in column-major order (0 or 1)
    pub fn to_column_major(&self) -> Vec<u8> {
        let mut values = Vec::with_capacity(self.data.len());
        for x in 0..self.width {
            for y in 0..self.height {
                values.push(self.get(x, y) as u8);
            }
        }
        values
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Number of foreground pixels
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v).count() as u64
    }

    /// True when no pixel is set
    pub fn is_blank(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Coordinates of every foreground pixel, row by row
    pub fn foreground(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    /// Tight bounding box over the foreground pixels.
    ///
    /// A blank mask yields `[0, 0, 0, 0]` rather than an error.
    pub fn bounding_box(&self) -> PixelBox {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for (x, y) in self.foreground() {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if !any {
            return [0, 0, 0, 0];
        }
        [min_x, min_y, max_x, max_y]
    }

    /// Fail with `SizeMismatch` unless the mask is `width` x `height`
    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(MaskError::SizeMismatch {
                expected_width: width,
                expected_height: height,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(width: u32, height: u32, from: u32, to: u32) -> BinaryMask {
        BinaryMask::from_fn(width, height, |x, y| (from..to).contains(&x) && (from..to).contains(&y))
    }

    #[test]
    fn test_bounding_box_is_tight() {
        let mut mask = BinaryMask::new(10, 8);
        mask.set(2, 3, true);
        mask.set(7, 5, true);
        assert_eq!(mask.bounding_box(), [2, 3, 7, 5]);
    }

    #[test]
    fn test_blank_mask_bounding_box() {
        let mask = BinaryMask::new(5, 5);
        assert!(mask.is_blank());
        assert_eq!(mask.bounding_box(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_column_major_layout() {
        let mut mask = BinaryMask::new(3, 2);
        mask.set(1, 0, true);
        // column 1 starts at index 2
        assert_eq!(mask.to_column_major(), vec![0, 0, 1, 0, 0, 0]);

        let back = BinaryMask::from_column_major(3, 2, &mask.to_column_major()).unwrap();
        assert_eq!(back, mask);
    }

    #[test]
    fn test_column_major_length_checked() {
        assert!(BinaryMask::from_column_major(3, 2, &[0, 1]).is_err());
    }

    #[test]
    fn test_luma_conversion() {
        let mask = square(20, 20, 5, 10);
        let luma = mask.to_luma();
        assert_eq!(luma.get_pixel(6, 6)[0], 255);
        assert_eq!(luma.get_pixel(0, 0)[0], 0);
        assert_eq!(BinaryMask::from_luma(&luma), mask);
        assert_eq!(mask.area(), 25);
    }

    #[test]
    fn test_ensure_dimensions() {
        let mask = BinaryMask::new(4, 3);
        assert!(mask.ensure_dimensions(4, 3).is_ok());
        assert!(matches!(
            mask.ensure_dimensions(3, 4),
            Err(MaskError::SizeMismatch { width: 4, height: 3, .. })
        ));
    }
}
