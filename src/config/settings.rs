use crate::cli::Args;
use crate::error::ConfigError;

use super::defaults::*;

/// How aggressively unused and duplicate objects are removed on save
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GarbageLevel {
    /// Keep every object
    Off = 0,
    /// Remove objects unreachable from the trailer
    Unused = 1,
    /// Also renumber objects compactly
    Compact = 2,
    /// Also merge duplicate non-stream objects
    MergeObjects = 3,
    /// Also merge duplicate streams
    MergeStreams = 4,
}

impl TryFrom<u8> for GarbageLevel {
    type Error = ConfigError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(GarbageLevel::Off),
            1 => Ok(GarbageLevel::Unused),
            2 => Ok(GarbageLevel::Compact),
            3 => Ok(GarbageLevel::MergeObjects),
            4 => Ok(GarbageLevel::MergeStreams),
            other => Err(ConfigError::InvalidGarbageLevel(other)),
        }
    }
}

/// Structural cleanup applied when the document is saved
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SaveOptions {
    pub garbage: GarbageLevel,
    /// Flate-compress streams that have no filter
    pub deflate: bool,
    /// Remove zero-length streams
    pub clean: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            garbage: GarbageLevel::MergeStreams,
            deflate: true,
            clean: true,
        }
    }
}

/// Runtime settings for a compression run
#[derive(Debug, Clone)]
pub struct Settings {
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Maximum width or height before an integer-ratio shrink is considered
    pub max_dimension: u32,
    pub save: SaveOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
            save: SaveOptions::default(),
        }
    }
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        Ok(Self {
            quality: args.quality,
            max_dimension: args.max_dim,
            save: SaveOptions {
                garbage: GarbageLevel::try_from(args.garbage)?,
                deflate: args.deflate(),
                clean: args.clean(),
            },
        })
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn with_save_options(mut self, save: SaveOptions) -> Self {
        self.save = save;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_garbage_level_parsing() {
        assert_eq!(GarbageLevel::try_from(0).unwrap(), GarbageLevel::Off);
        assert_eq!(GarbageLevel::try_from(4).unwrap(), GarbageLevel::MergeStreams);
        assert!(GarbageLevel::try_from(5).is_err());
    }

    #[test]
    fn test_garbage_levels_are_ordered() {
        assert!(GarbageLevel::MergeStreams > GarbageLevel::MergeObjects);
        assert!(GarbageLevel::Compact >= GarbageLevel::Unused);
    }

    #[test]
    fn test_from_args() {
        let args = Args::parse_from(["pdf-compress", "in.pdf", "-q", "55", "-g", "1", "--no-deflate"]);
        let settings = Settings::from_args(&args).unwrap();

        assert_eq!(settings.quality, 55);
        assert_eq!(settings.max_dimension, DEFAULT_MAX_DIMENSION);
        assert_eq!(settings.save.garbage, GarbageLevel::Unused);
        assert!(!settings.save.deflate);
        assert!(settings.save.clean);
    }

    #[test]
    fn test_builder_clamps() {
        let settings = Settings::default().with_quality(0).with_max_dimension(0);
        assert_eq!(settings.quality, 1);
        assert_eq!(settings.max_dimension, 1);
    }
}
