use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::defaults::{
    DEFAULT_GARBAGE_LEVEL, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY, OUTPUT_SUFFIX,
};

#[derive(Parser, Debug)]
#[command(name = "pdf-compress")]
#[command(
    author,
    version,
    about = "Compress PDF files by re-compressing images as JPEG"
)]
pub struct Args {
    /// Input PDF file path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output PDF file path (defaults to <input>_compressed.pdf)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JPEG quality (1-100); lower means smaller files
    #[arg(short, long, default_value_t = DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Maximum width or height for images; larger images are downscaled
    #[arg(short = 'm', long = "max-dim", default_value_t = DEFAULT_MAX_DIMENSION, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_dim: u32,

    /// Garbage collection level applied on save (0 = off, 4 = merge duplicate streams)
    #[arg(short, long, default_value_t = DEFAULT_GARBAGE_LEVEL, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub garbage: u8,

    /// Do not deflate uncompressed streams on save
    #[arg(long)]
    pub no_deflate: bool,

    /// Do not remove empty streams on save
    #[arg(long)]
    pub no_clean: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Get the output path, defaulting to `<stem>_compressed<ext>` next to the input
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Check if streams should be deflated on save
    pub fn deflate(&self) -> bool {
        !self.no_deflate
    }

    /// Check if empty streams should be removed on save
    pub fn clean(&self) -> bool {
        !self.no_clean
    }
}

/// Derive `<stem>_compressed<ext>` in the same directory as `input`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();

    let mut name = OsString::from(stem);
    name.push(OUTPUT_SUFFIX);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }

    input.with_file_name(name)
}
