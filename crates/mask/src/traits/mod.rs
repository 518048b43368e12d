use crate::{error::Result, types::BinaryMask};

/// Trait for mask codecs that turn binary masks into their stored form and back
pub trait MaskCodec: Send + Sync {
    /// Encoded representation as stored in annotation files
    type Encoded;

    /// Encode a binary mask
    fn encode(&self, mask: &BinaryMask) -> Self::Encoded;

    /// Decode a stored mask; must invert `encode` losslessly
    fn decode(&self, encoded: &Self::Encoded) -> Result<BinaryMask>;
}
