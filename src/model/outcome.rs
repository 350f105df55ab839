use std::fmt;

use lopdf::ObjectId;

use crate::error::ImageError;

/// Why an image was left alone without being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already handled earlier in this document pass
    AlreadyProcessed,
    /// `/ImageMask true` stencil; it has no color data to re-encode
    StencilMask,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyProcessed => write!(f, "already processed"),
            SkipReason::StencilMask => write!(f, "stencil mask"),
        }
    }
}

/// Details of one successfully re-encoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub id: ObjectId,
    pub original_dims: (u32, u32),
    pub new_dims: (u32, u32),
    /// Encoded stream length before replacement
    pub original_bytes: usize,
    /// JPEG length after replacement
    pub new_bytes: usize,
    /// Whether a multi-channel color space was converted to RGB
    pub converted_to_rgb: bool,
}

/// Result of running the compressor on a single image reference
#[derive(Debug)]
pub enum ImageOutcome {
    Compressed(CompressedImage),
    Skipped(SkipReason),
    Failed(ImageError),
}

impl ImageOutcome {
    pub fn is_compressed(&self) -> bool {
        matches!(self, ImageOutcome::Compressed(_))
    }
}

/// Running totals for one document pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionStats {
    pub pages: usize,
    pub compressed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Sum of original stream lengths for compressed images
    pub bytes_before: usize,
    /// Sum of JPEG lengths for compressed images
    pub bytes_after: usize,
}

impl CompressionStats {
    pub fn record(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::Compressed(image) => {
                self.compressed += 1;
                self.bytes_before += image.original_bytes;
                self.bytes_after += image.new_bytes;
            }
            ImageOutcome::Skipped(_) => self.skipped += 1,
            ImageOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Distinct images that were attempted (compressed or failed)
    pub fn attempted(&self) -> usize {
        self.compressed + self.failed
    }
}
