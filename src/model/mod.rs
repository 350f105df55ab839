pub mod colorspace;
pub mod outcome;
pub mod pixmap;

pub use colorspace::ColorSpace;
pub use outcome::{CompressedImage, CompressionStats, ImageOutcome, SkipReason};
pub use pixmap::Pixmap;
