pub mod cli;
pub mod compressor;
pub mod config;
pub mod error;
pub mod model;
pub mod pdf;
pub mod preflight;
pub mod report;

pub use compressor::{compress_document, ImageCompressor, NoProgress, Progress};
pub use config::{GarbageLevel, SaveOptions, Settings};
pub use error::{CompressError, ConfigError, ImageError};
pub use model::{CompressionStats, ImageOutcome};
pub use pdf::CleanupReport;
pub use preflight::check_backends;
pub use report::SizeReport;

use std::path::Path;

use lopdf::Document;

use pdf::save_document;

/// Result of compressing one file
#[derive(Debug, Clone)]
pub struct CompressionSummary {
    pub stats: CompressionStats,
    pub cleanup: CleanupReport,
    pub sizes: SizeReport,
}

/// High-level API for compressing a PDF file.
///
/// This is the recommended entry point for library consumers. It loads
/// `input`, re-encodes every distinct image once, applies the save options in
/// `settings` and writes the result to `output`. Individual images that cannot
/// be processed are left as they were and counted in the returned stats.
///
/// # Example
///
/// ```no_run
/// use pdf_compress::{compress_file, NoProgress, Settings};
/// use std::path::Path;
///
/// let settings = Settings::default().with_quality(40);
/// let summary = compress_file(
///     Path::new("scan.pdf"),
///     Path::new("scan_compressed.pdf"),
///     &settings,
///     &mut NoProgress,
/// )
/// .unwrap();
///
/// println!("{}", summary.sizes);
/// ```
pub fn compress_file(
    input: &Path,
    output: &Path,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> Result<CompressionSummary, CompressError> {
    if !input.is_file() {
        return Err(CompressError::InputNotFound(input.to_path_buf()));
    }

    let mut doc = Document::load(input).map_err(|source| CompressError::Load {
        path: input.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded {} (PDF {}, {} objects)",
        input.display(),
        doc.version,
        doc.objects.len()
    );

    let stats = compress_document(&mut doc, settings, progress);
    let cleanup = save_document(&mut doc, output, &settings.save)?;
    let sizes = SizeReport::from_paths(input, output)?;

    Ok(CompressionSummary {
        stats,
        cleanup,
        sizes,
    })
}
