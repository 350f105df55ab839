/// Default JPEG quality for re-encoded images
pub const DEFAULT_QUALITY: u8 = 30;

/// Default maximum image width or height in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 2000;

/// Default garbage collection level on save, up to merging duplicate streams
pub const DEFAULT_GARBAGE_LEVEL: u8 = 4;

/// Suffix appended to the input file stem when no output path is given
pub const OUTPUT_SUFFIX: &str = "_compressed";

/// Bytes per mebibyte, used by the size report
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
