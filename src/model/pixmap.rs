use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use super::colorspace::ColorSpace;
use crate::error::ImageError;

/// A decoded image: 8 bits per sample, channels interleaved, rows top to bottom
#[derive(Debug, Clone)]
pub struct Pixmap {
    width: u32,
    height: u32,
    colorspace: ColorSpace,
    samples: Vec<u8>,
}

impl Pixmap {
    /// Wrap a sample buffer, checking it covers `width * height * channels` bytes.
    /// Extra trailing bytes are dropped.
    pub fn new(
        width: u32,
        height: u32,
        colorspace: ColorSpace,
        mut samples: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if width == 0 {
            return Err(ImageError::MissingDimension("Width"));
        }
        if height == 0 {
            return Err(ImageError::MissingDimension("Height"));
        }

        let expected = width as usize * height as usize * colorspace.channels();
        if samples.len() < expected {
            return Err(ImageError::TruncatedData {
                expected,
                actual: samples.len(),
            });
        }
        samples.truncate(expected);

        Ok(Self {
            width,
            height,
            colorspace,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn colorspace(&self) -> &ColorSpace {
        &self.colorspace
    }

    pub fn channels(&self) -> usize {
        self.colorspace.channels()
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Larger of width and height
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Convert a four-channel (CMYK) pixmap to DeviceRGB.
    ///
    /// Pixmaps with three or fewer channels are returned unchanged.
    pub fn into_rgb(self) -> Self {
        if self.channels() <= 3 {
            return self;
        }

        let pixels = self.width as usize * self.height as usize;
        let mut rgb = Vec::with_capacity(pixels * 3);
        for px in self.samples.chunks_exact(4) {
            let k = 255 - px[3] as u32;
            for &ink in &px[..3] {
                rgb.push(((255 - ink as u32) * k / 255) as u8);
            }
        }

        Self {
            width: self.width,
            height: self.height,
            colorspace: ColorSpace::DeviceRgb,
            samples: rgb,
        }
    }

    /// Shrink both dimensions by the integer `factor`, averaging each
    /// `factor x factor` block. Leftover edge pixels are discarded.
    pub fn shrink(&self, factor: u32) -> Self {
        if factor <= 1 {
            return self.clone();
        }

        let channels = self.channels();
        let new_width = (self.width / factor).max(1);
        let new_height = (self.height / factor).max(1);
        let block_w = factor.min(self.width) as usize;
        let block_h = factor.min(self.height) as usize;
        let row_stride = self.width as usize * channels;

        let mut out = Vec::with_capacity(new_width as usize * new_height as usize * channels);
        let mut acc = vec![0u32; channels];
        let count = (block_w * block_h) as u32;

        for by in 0..new_height as usize {
            for bx in 0..new_width as usize {
                acc.iter_mut().for_each(|a| *a = 0);
                for y in by * block_h..(by + 1) * block_h {
                    let row = &self.samples[y * row_stride..(y + 1) * row_stride];
                    for x in bx * block_w..(bx + 1) * block_w {
                        let px = &row[x * channels..(x + 1) * channels];
                        for (a, &s) in acc.iter_mut().zip(px) {
                            *a += s as u32;
                        }
                    }
                }
                out.extend(acc.iter().map(|&a| ((a + count / 2) / count) as u8));
            }
        }

        Self {
            width: new_width,
            height: new_height,
            colorspace: self.colorspace.clone(),
            samples: out,
        }
    }

    /// Encode as a baseline JPEG at `quality` (1-100)
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
        let color_type = match self.channels() {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            n => {
                return Err(ImageError::Encode(format!(
                    "cannot encode {} channels as JPEG",
                    n
                )))
            }
        };

        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
        encoder
            .encode(&self.samples, self.width, self.height, color_type)
            .map_err(|e| ImageError::Encode(e.to_string()))?;

        Ok(jpeg)
    }
}
