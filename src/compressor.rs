//! Per-image normalization and JPEG re-encoding.

use std::collections::HashSet;

use lopdf::{Document, ObjectId};

use crate::config::Settings;
use crate::model::{CompressedImage, CompressionStats, ImageOutcome, SkipReason};
use crate::pdf::{decode_image, image_stream, is_stencil_mask, page_images, replace_image};

/// Integer shrink factor for an image whose larger side is `largest`.
///
/// Only images at least twice `max_dimension` are shrunk; anything between
/// `max_dimension` and `2 * max_dimension - 1` is left at full size.
pub fn shrink_factor(largest: u32, max_dimension: u32) -> Option<u32> {
    if max_dimension == 0 || largest <= max_dimension {
        return None;
    }
    let factor = largest / max_dimension;
    (factor > 1).then_some(factor)
}

/// Progress hooks for a document pass
pub trait Progress {
    /// Called before page `index` (1-based) of `total` is processed
    fn page(&mut self, _index: usize, _total: usize) {}

    /// Called once every page has been processed, before saving
    fn saving(&mut self) {}
}

/// Progress sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Re-encodes the images of one document, each reference id at most once
pub struct ImageCompressor<'a> {
    doc: &'a mut Document,
    quality: u8,
    max_dimension: u32,
    processed: HashSet<ObjectId>,
}

impl<'a> ImageCompressor<'a> {
    pub fn new(doc: &'a mut Document, settings: &Settings) -> Self {
        Self {
            doc,
            quality: settings.quality,
            max_dimension: settings.max_dimension,
            processed: HashSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn is_processed(&self, id: ObjectId) -> bool {
        self.processed.contains(&id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Normalize, shrink and re-encode the image at `id`.
    ///
    /// The id is recorded as processed whatever the result, so a failing
    /// image is never attempted twice.
    pub fn compress_image(&mut self, id: ObjectId) -> ImageOutcome {
        if self.processed.contains(&id) {
            return ImageOutcome::Skipped(SkipReason::AlreadyProcessed);
        }

        let outcome = self.attempt(id);
        self.processed.insert(id);

        match &outcome {
            ImageOutcome::Compressed(image) => log::debug!(
                "Image {:?}: {}x{} -> {}x{}, {} -> {} bytes",
                id,
                image.original_dims.0,
                image.original_dims.1,
                image.new_dims.0,
                image.new_dims.1,
                image.original_bytes,
                image.new_bytes
            ),
            ImageOutcome::Skipped(reason) => log::debug!("Image {:?}: skipped ({})", id, reason),
            ImageOutcome::Failed(e) => log::debug!("Image {:?}: left unchanged: {}", id, e),
        }

        outcome
    }

    fn attempt(&mut self, id: ObjectId) -> ImageOutcome {
        match image_stream(self.doc, id) {
            Ok(stream) if is_stencil_mask(stream) => {
                return ImageOutcome::Skipped(SkipReason::StencilMask)
            }
            Ok(_) => {}
            Err(e) => return ImageOutcome::Failed(e),
        }

        let pixmap = match decode_image(self.doc, id) {
            Ok(pixmap) => pixmap,
            Err(e) => return ImageOutcome::Failed(e),
        };
        let original_dims = (pixmap.width(), pixmap.height());
        let converted_to_rgb = pixmap.channels() > 3;

        let pixmap = pixmap.into_rgb();
        let pixmap = match shrink_factor(pixmap.max_dimension(), self.max_dimension) {
            Some(factor) => pixmap.shrink(factor),
            None => pixmap,
        };

        let jpeg = match pixmap.encode_jpeg(self.quality) {
            Ok(jpeg) => jpeg,
            Err(e) => return ImageOutcome::Failed(e),
        };
        let new_bytes = jpeg.len();

        match replace_image(self.doc, id, &pixmap, jpeg) {
            Ok(original_bytes) => ImageOutcome::Compressed(CompressedImage {
                id,
                original_dims,
                new_dims: (pixmap.width(), pixmap.height()),
                original_bytes,
                new_bytes,
                converted_to_rgb,
            }),
            Err(e) => ImageOutcome::Failed(e),
        }
    }
}

/// Visit every page in order and compress each distinct image once
pub fn compress_document(
    doc: &mut Document,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> CompressionStats {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let total = pages.len();
    let mut stats = CompressionStats {
        pages: total,
        ..Default::default()
    };

    let mut compressor = ImageCompressor::new(doc, settings);
    for (index, page_id) in pages.into_iter().enumerate() {
        progress.page(index + 1, total);

        for image_id in page_images(compressor.document(), page_id) {
            if compressor.is_processed(image_id) {
                continue;
            }
            let outcome = compressor.compress_image(image_id);
            stats.record(&outcome);
        }
    }
    progress.saving();

    log::info!(
        "Processed {} pages: {} images compressed, {} skipped, {} left unchanged",
        stats.pages,
        stats.compressed,
        stats.skipped,
        stats.failed
    );

    stats
}
