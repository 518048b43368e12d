use mask::BinaryMask;

/// Per-pixel instance ownership derived from the instance masks.
///
/// Masks are painted in index order, so where masks overlap the pixel belongs
/// to the highest-index instance. Raw layer values are `index + 1` with `0`
/// for background, the convention label layers expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl LabelMap {
    pub const BACKGROUND: u32 = 0;

    /// Paint every mask in order onto a `width` x `height` map
    pub fn from_masks(width: u32, height: u32, masks: &[BinaryMask]) -> Self {
        let mut data = vec![Self::BACKGROUND; width as usize * height as usize];
        for (index, mask) in masks.iter().enumerate() {
            let value = index as u32 + 1;
            for (x, y) in mask.foreground() {
                if x < width && y < height {
                    data[y as usize * width as usize + x as usize] = value;
                }
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Index of the instance owning the pixel, `None` for background
    pub fn instance_at(&self, x: u32, y: u32) -> Option<usize> {
        match self.data[y as usize * self.width as usize + x as usize] {
            Self::BACKGROUND => None,
            value => Some(value as usize - 1),
        }
    }

    /// Row-major layer values
    pub fn as_raw(&self) -> &[u32] {
        &self.data
    }

    /// Number of pixels owned by `instance`
    pub fn pixel_count(&self, instance: usize) -> usize {
        let value = instance as u32 + 1;
        self.data.iter().filter(|&&v| v == value).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_mask_wins_overlap() {
        let first = BinaryMask::from_fn(10, 10, |x, _| x < 6);
        let second = BinaryMask::from_fn(10, 10, |x, _| x >= 4);
        let labels = LabelMap::from_masks(10, 10, &[first, second]);

        assert_eq!(labels.instance_at(0, 0), Some(0));
        assert_eq!(labels.instance_at(4, 3), Some(1));
        assert_eq!(labels.instance_at(5, 9), Some(1));
        assert_eq!(labels.pixel_count(0), 40);
        assert_eq!(labels.pixel_count(1), 60);
    }

    #[test]
    fn test_uncovered_pixels_are_background() {
        let mut only = BinaryMask::new(4, 4);
        only.set(2, 2, true);
        let labels = LabelMap::from_masks(4, 4, &[only]);

        assert_eq!(labels.instance_at(0, 0), None);
        assert_eq!(labels.instance_at(2, 2), Some(0));
        assert_eq!(labels.as_raw()[2 * 4 + 2], 1);
        assert_eq!(labels.as_raw().iter().filter(|&&v| v == LabelMap::BACKGROUND).count(), 15);
    }

    #[test]
    fn test_no_masks() {
        let labels = LabelMap::from_masks(3, 2, &[]);
        assert_eq!(labels.as_raw(), &[0; 6]);
    }
}
