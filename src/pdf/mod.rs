//! PDF object-graph plumbing on top of lopdf

pub mod cleanup;
pub mod decode;
pub mod filters;
pub mod images;
pub mod replace;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cleanup::{apply_cleanup, save_document, CleanupReport};
pub use decode::{decode_image, image_stream, is_stencil_mask};
pub use images::page_images;
pub use replace::replace_image;
