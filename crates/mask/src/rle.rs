//! COCO run-length encoding.
//!
//! Masks are scanned in column-major (Fortran) order and stored as alternating
//! run lengths, starting with a run of background pixels. The compressed
//! string form matches `rleToString`/`rleFrString` from the COCO mask API so
//! files stay readable by pycocotools.

use serde::{Deserialize, Serialize};

use crate::{
    error::{MaskError, Result},
    types::BinaryMask,
};

/// Run-length encoded mask with `size = [height, width]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rle {
    pub size: [u32; 2],
    pub counts: Vec<u32>,
}

impl Rle {
    pub fn height(&self) -> u32 {
        self.size[0]
    }

    pub fn width(&self) -> u32 {
        self.size[1]
    }

    /// Encode a mask into alternating background/foreground runs
    pub fn encode(mask: &BinaryMask) -> Self {
        let mut counts = Vec::new();
        let mut previous = 0u8;
        let mut run = 0u32;

        for value in mask.to_column_major() {
            if value != previous {
                counts.push(run);
                run = 0;
                previous = value;
            }
            run += 1;
        }
        counts.push(run);

        Self {
            size: [mask.height(), mask.width()],
            counts,
        }
    }

    /// Decode back into a mask; the runs must cover every pixel exactly once.
    pub fn decode(&self) -> Result<BinaryMask> {
        let total = self.height() as u64 * self.width() as u64;
        let covered: u64 = self.counts.iter().map(|&c| c as u64).sum();
        if covered != total {
            return Err(MaskError::InvalidRle(format!(
                "runs cover {} pixels but size {}x{} has {}",
                covered,
                self.width(),
                self.height(),
                total
            )));
        }

        let mut values = Vec::with_capacity(total as usize);
        let mut value = 0u8;
        for &count in &self.counts {
            values.extend(std::iter::repeat_n(value, count as usize));
            value = 1 - value;
        }

        BinaryMask::from_column_major(self.width(), self.height(), &values)
    }

    /// Number of foreground pixels (sum of the odd runs)
    pub fn area(&self) -> u64 {
        self.counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
    }

    /// Compress the counts into the COCO string form
    pub fn to_compressed_string(&self) -> String {
        let mut s = String::new();
        for (i, &count) in self.counts.iter().enumerate() {
            let mut x = count as i64;
            if i > 2 {
                x -= self.counts[i - 2] as i64;
            }
            loop {
                let mut c = (x & 0x1f) as u8;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                s.push((c + 48) as char);
                if !more {
                    break;
                }
            }
        }
        s
    }

    /// Parse the COCO compressed string form
    pub fn from_compressed_string(size: [u32; 2], s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let mut counts: Vec<u32> = Vec::new();
        let mut p = 0;

        while p < bytes.len() {
            let mut x: i64 = 0;
            let mut k = 0;
            loop {
                let byte = bytes[p];
                if !(48..48 + 64).contains(&byte) {
                    return Err(MaskError::InvalidRle(format!(
                        "invalid character {:?} at offset {}",
                        byte as char, p
                    )));
                }
                if k >= 12 {
                    return Err(MaskError::InvalidRle(format!("run at offset {} is too long", p)));
                }
                let c = (byte - 48) as i64;
                x |= (c & 0x1f) << (5 * k);
                p += 1;
                k += 1;

                if c & 0x20 == 0 {
                    if c & 0x10 != 0 {
                        x |= -1i64 << (5 * k);
                    }
                    break;
                }
                if p >= bytes.len() {
                    return Err(MaskError::InvalidRle("string ends inside a run".to_string()));
                }
            }

            let m = counts.len();
            if m > 2 {
                x += counts[m - 2] as i64;
            }
            let count = u32::try_from(x)
                .map_err(|_| MaskError::InvalidRle(format!("run {} has invalid length {}", m, x)))?;
            counts.push(count);
        }

        Ok(Self { size, counts })
    }
}

/// Segmentation field of an annotation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// RLE with compressed string counts, as written by pycocotools
    Compressed { size: [u32; 2], counts: String },
    /// RLE with plain integer counts
    Uncompressed { size: [u32; 2], counts: Vec<u32> },
    /// Polygon outlines, flat `[x0, y0, x1, y1, ...]` lists
    Polygon(Vec<Vec<f64>>),
}

impl Segmentation {
    /// Compressed segmentation for an RLE
    pub fn from_rle(rle: &Rle) -> Self {
        Self::Compressed {
            size: rle.size,
            counts: rle.to_compressed_string(),
        }
    }

    pub fn to_rle(&self) -> Result<Rle> {
        match self {
            Self::Compressed { size, counts } => Rle::from_compressed_string(*size, counts),
            Self::Uncompressed { size, counts } => Ok(Rle {
                size: *size,
                counts: counts.clone(),
            }),
            Self::Polygon(_) => Err(MaskError::UnsupportedSegmentation(
                "polygon segmentations cannot be decoded into masks".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mask() -> BinaryMask {
        BinaryMask::from_fn(7, 5, |x, y| ((2..5).contains(&x) && (1..4).contains(&y)) || (x == 6 && y == 0))
    }

    #[test]
    fn test_encode_starts_with_background() {
        let mut mask = BinaryMask::new(2, 2);
        mask.set(0, 0, true);
        let rle = Rle::encode(&mask);
        assert_eq!(rle.counts, vec![0, 1, 3]);
        assert_eq!(rle.size, [2, 2]);
    }

    #[test]
    fn test_decode_center_pixel() {
        let rle = Rle { size: [3, 3], counts: vec![4, 1, 4] };
        let mask = rle.decode().unwrap();
        assert!(mask.get(1, 1));
        assert_eq!(mask.area(), 1);
    }

    #[test]
    fn test_decode_rejects_wrong_total() {
        let rle = Rle { size: [3, 3], counts: vec![4, 1, 3] };
        assert!(matches!(rle.decode(), Err(MaskError::InvalidRle(_))));
    }

    #[test]
    fn test_roundtrip_preserves_mask() {
        let mask = sample_mask();
        let rle = Rle::encode(&mask);
        assert_eq!(rle.area(), mask.area());
        assert_eq!(rle.decode().unwrap(), mask);
    }

    #[test]
    fn test_compressed_string_known_values() {
        let rle = Rle { size: [3, 3], counts: vec![4, 1, 4] };
        assert_eq!(rle.to_compressed_string(), "414");

        // counts after the third are stored as deltas against counts[i - 2]
        let rle = Rle { size: [1, 14], counts: vec![2, 3, 4, 5] };
        assert_eq!(rle.to_compressed_string(), "2342");

        let rle = Rle { size: [1, 100], counts: vec![100] };
        assert_eq!(rle.to_compressed_string(), "T3");
    }

    #[test]
    fn test_compressed_string_negative_delta() {
        let rle = Rle { size: [1, 16], counts: vec![10, 2, 3, 1] };
        let s = rle.to_compressed_string();
        let parsed = Rle::from_compressed_string(rle.size, &s).unwrap();
        assert_eq!(parsed, rle);
    }

    #[test]
    fn test_compressed_string_large_counts() {
        let rle = Rle { size: [100, 100], counts: vec![100, 200, 9000, 700] };
        let parsed = Rle::from_compressed_string(rle.size, &rle.to_compressed_string()).unwrap();
        assert_eq!(parsed.counts, rle.counts);
    }

    #[test]
    fn test_compressed_string_rejects_garbage() {
        assert!(Rle::from_compressed_string([1, 1], "\u{7f}").is_err());
        // continuation bit set on the last character
        assert!(Rle::from_compressed_string([1, 1], "P").is_err());
    }

    #[test]
    fn test_segmentation_forms() {
        let compressed: Segmentation =
            serde_json::from_str(r#"{"size": [3, 3], "counts": "414"}"#).unwrap();
        let uncompressed: Segmentation =
            serde_json::from_str(r#"{"size": [3, 3], "counts": [4, 1, 4]}"#).unwrap();
        assert!(matches!(compressed, Segmentation::Compressed { .. }));
        assert!(matches!(uncompressed, Segmentation::Uncompressed { .. }));
        assert_eq!(compressed.to_rle().unwrap(), uncompressed.to_rle().unwrap());

        let polygon: Segmentation = serde_json::from_str("[[0.0, 0.0, 2.0, 0.0, 2.0, 2.0]]").unwrap();
        assert!(matches!(polygon.to_rle(), Err(MaskError::UnsupportedSegmentation(_))));
    }

    #[test]
    fn test_segmentation_serializes_as_coco_dict() {
        let seg = Segmentation::from_rle(&Rle { size: [3, 3], counts: vec![4, 1, 4] });
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json, serde_json::json!({"size": [3, 3], "counts": "414"}));
    }
}
