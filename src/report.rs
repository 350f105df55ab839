use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::defaults::BYTES_PER_MB;

/// File sizes before and after compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub original: u64,
    pub compressed: u64,
}

impl SizeReport {
    pub fn new(original: u64, compressed: u64) -> Self {
        Self {
            original,
            compressed,
        }
    }

    /// Read both sizes from disk
    pub fn from_paths(input: &Path, output: &Path) -> io::Result<Self> {
        Ok(Self::new(
            fs::metadata(input)?.len(),
            fs::metadata(output)?.len(),
        ))
    }

    pub fn original_mb(&self) -> f64 {
        self.original as f64 / BYTES_PER_MB
    }

    pub fn compressed_mb(&self) -> f64 {
        self.compressed as f64 / BYTES_PER_MB
    }

    /// `(1 - compressed / original) * 100`, or `None` for an empty original
    pub fn reduction_percent(&self) -> Option<f64> {
        (self.original > 0).then(|| (1.0 - self.compressed as f64 / self.original as f64) * 100.0)
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original size: {:.2} MB", self.original_mb())?;
        write!(f, "Compressed size: {:.2} MB", self.compressed_mb())?;
        if let Some(reduction) = self.reduction_percent() {
            write!(f, "\nReduction: {:.1}%", reduction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_size() {
        let report = SizeReport::new(10_485_760, 5_242_880);
        assert_eq!(
            report.to_string(),
            "Original size: 10.00 MB\nCompressed size: 5.00 MB\nReduction: 50.0%"
        );
    }

    #[test]
    fn test_empty_original_has_no_reduction() {
        let report = SizeReport::new(0, 1024);
        assert_eq!(report.reduction_percent(), None);
        assert!(!report.to_string().contains("Reduction"));
    }

    #[test]
    fn test_growth_is_negative_reduction() {
        let report = SizeReport::new(1000, 1100);
        assert_eq!(format!("{:.1}", report.reduction_percent().unwrap()), "-10.0");
    }

    #[test]
    fn test_from_paths() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        fs::write(&input, vec![0u8; 2048]).unwrap();
        fs::write(&output, vec![0u8; 512]).unwrap();

        let report = SizeReport::from_paths(&input, &output).unwrap();
        assert_eq!(report, SizeReport::new(2048, 512));
        assert_eq!(report.reduction_percent(), Some(75.0));
    }
}
