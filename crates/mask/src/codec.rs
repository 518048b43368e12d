use crate::{
    error::Result,
    rle::{Rle, Segmentation},
    traits::MaskCodec,
    types::BinaryMask,
};

/// COCO RLE codec writing compressed-string segmentations
#[derive(Debug, Clone, Copy, Default)]
pub struct CocoRleCodec;

impl MaskCodec for CocoRleCodec {
    type Encoded = Segmentation;

    fn encode(&self, mask: &BinaryMask) -> Segmentation {
        Segmentation::from_rle(&Rle::encode(mask))
    }

    fn decode(&self, encoded: &Segmentation) -> Result<BinaryMask> {
        encoded.to_rle()?.decode()
    }
}
