//! Materialize image XObjects into [`Pixmap`]s.

use image::{DynamicImage, ImageFormat};
use lopdf::{Document, Object, ObjectId, Stream};

use super::filters::{decode_lossless, filter_chain};
use crate::error::ImageError;
use crate::model::{ColorSpace, Pixmap};

/// Look up `id` and check that it is an image XObject stream
pub fn image_stream(doc: &Document, id: ObjectId) -> Result<&Stream, ImageError> {
    let stream = doc
        .get_object(id)
        .and_then(Object::as_stream)
        .map_err(|_| ImageError::NotAnImage)?;

    match stream.dict.get(b"Subtype").and_then(Object::as_name) {
        Ok(b"Image") => Ok(stream),
        _ => Err(ImageError::NotAnImage),
    }
}

/// `/ImageMask true` stencils carry no color space of their own
pub fn is_stencil_mask(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)))
}

fn dimension(doc: &Document, stream: &Stream, key: &'static str) -> Result<u32, ImageError> {
    stream
        .dict
        .get(key.as_bytes())
        .and_then(|o| doc.dereference(o))
        .and_then(|(_, o)| o.as_i64())
        .ok()
        .filter(|&v| v > 0 && v <= u32::MAX as i64)
        .map(|v| v as u32)
        .ok_or(ImageError::MissingDimension(key))
}

/// Decode the image stored at `id` into 8-bit samples.
///
/// Palette images are expanded to their base color space. DCT images come
/// back as gray or RGB, whatever the JPEG decoder produces.
pub fn decode_image(doc: &Document, id: ObjectId) -> Result<Pixmap, ImageError> {
    let stream = image_stream(doc, id)?;
    let width = dimension(doc, stream, "Width")?;
    let height = dimension(doc, stream, "Height")?;

    let filters = filter_chain(doc, stream)?;
    let declared = stream
        .dict
        .get(b"ColorSpace")
        .map_err(|_| ImageError::UnsupportedColorSpace("missing /ColorSpace".to_string()))
        .and_then(|cs| ColorSpace::from_object(doc, cs));

    let decode = decode_array(stream);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") => {
            let data = decode_lossless(doc, stream, &filters[..filters.len() - 1])?;
            decode_jpeg(&data, declared.ok(), decode.as_deref())
        }
        _ => {
            let data = decode_lossless(doc, stream, &filters)?;
            let bits = stream
                .dict
                .get(b"BitsPerComponent")
                .and_then(Object::as_i64)
                .unwrap_or(8);
            unpack_raw(width, height, declared?, bits, decode.as_deref(), data)
        }
    }
}

fn decode_jpeg(
    data: &[u8],
    declared: Option<ColorSpace>,
    decode: Option<&[f32]>,
) -> Result<Pixmap, ImageError> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    // Keep a calibrated or ICC space when the decoded channel count still matches it
    let keep = |channels: usize| declared.clone().filter(|cs| cs.channels() == channels);

    let (width, height, channels, mut samples) = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
            let gray = img.to_luma8();
            let (w, h) = gray.dimensions();
            (w, h, 1, gray.into_raw())
        }
        _ => {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            (w, h, 3, rgb.into_raw())
        }
    };
    let colorspace = keep(channels);

    if let Some(decode) = decode.filter(|d| !is_identity_decode(d, channels)) {
        match &colorspace {
            // Lab keeps its /Decode ranges on the replacement stream
            Some(ColorSpace::Lab(_)) => {}
            Some(_) => apply_decode(&mut samples, channels, decode),
            // The decoder changed the channel layout, so the mapping no longer lines up
            None => {
                return Err(ImageError::Decode(format!(
                    "/Decode on a JPEG decoded to {} channel(s) from {}",
                    channels,
                    declared.map_or_else(|| "no color space".to_string(), |cs| cs.to_string())
                )))
            }
        }
    }

    let colorspace = colorspace.unwrap_or(if channels == 1 {
        ColorSpace::DeviceGray
    } else {
        ColorSpace::DeviceRgb
    });
    Pixmap::new(width, height, colorspace, samples)
}

fn decode_array(stream: &Stream) -> Option<Vec<f32>> {
    let items = stream.dict.get(b"Decode").and_then(Object::as_array).ok()?;
    items
        .iter()
        .map(|o| match o {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r as f32),
            _ => None,
        })
        .collect()
}

fn unpack_raw(
    width: u32,
    height: u32,
    colorspace: ColorSpace,
    bits: i64,
    decode: Option<&[f32]>,
    data: Vec<u8>,
) -> Result<Pixmap, ImageError> {
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(ImageError::UnsupportedBitDepth(bits));
    }
    let bits = bits as usize;
    let channels = colorspace.channels();
    let indexed = matches!(colorspace, ColorSpace::Indexed { .. });
    // Lab decode ranges are not normalized to 0-1
    let linear = !indexed && !matches!(colorspace, ColorSpace::Lab(_));

    let samples_per_row = width as usize * channels;
    let row_bytes = (samples_per_row * bits).div_ceil(8);
    let expected = row_bytes * height as usize;
    if data.len() < expected {
        return Err(ImageError::TruncatedData {
            expected,
            actual: data.len(),
        });
    }

    let mut samples = if bits == 8 {
        if row_bytes == samples_per_row {
            data
        } else {
            data.chunks(row_bytes)
                .take(height as usize)
                .flat_map(|row| row[..samples_per_row].iter().copied())
                .collect()
        }
    } else {
        let mut out = Vec::with_capacity(samples_per_row * height as usize);
        for row in data.chunks(row_bytes).take(height as usize) {
            unpack_row(row, samples_per_row, bits, !indexed, &mut out);
        }
        out
    };

    if let Some(decode) = decode {
        if linear {
            apply_decode(&mut samples, channels, decode);
        } else if indexed {
            apply_index_decode(&mut samples, bits, decode);
        }
    }

    match colorspace {
        ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } => {
            let expanded = expand_palette(&samples, base.channels(), hival, &lookup);
            Pixmap::new(width, height, *base, expanded)
        }
        other => Pixmap::new(width, height, other, samples),
    }
}

/// Unpack one row of 1, 2, 4 or 16-bit samples to bytes.
/// Sub-byte values are stretched to 0-255 unless they are palette indices.
fn unpack_row(row: &[u8], count: usize, bits: usize, scale: bool, out: &mut Vec<u8>) {
    if bits == 16 {
        out.extend(row.chunks_exact(2).take(count).map(|pair| pair[0]));
        return;
    }

    let max = (1u16 << bits) - 1;
    let per_byte = 8 / bits;
    for i in 0..count {
        let byte = row[i / per_byte];
        let shift = 8 - bits * (i % per_byte + 1);
        let value = (byte >> shift) as u16 & max;
        out.push(if scale {
            (value * 255 / max) as u8
        } else {
            value as u8
        });
    }
}

/// A missing or short array, or `[0 1]` for every channel, leaves samples as they are
fn is_identity_decode(decode: &[f32], channels: usize) -> bool {
    decode.len() < channels * 2
        || decode
            .chunks_exact(2)
            .take(channels)
            .all(|pair| pair[0] == 0.0 && pair[1] == 1.0)
}

/// Map samples through a `/Decode` array of `[min max]` pairs per channel
fn apply_decode(samples: &mut [u8], channels: usize, decode: &[f32]) {
    if is_identity_decode(decode, channels) {
        return;
    }

    for (i, sample) in samples.iter_mut().enumerate() {
        let c = i % channels;
        let (lo, hi) = (decode[c * 2], decode[c * 2 + 1]);
        let value = lo + (*sample as f32 / 255.0) * (hi - lo);
        *sample = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

/// Remap raw palette indices through `/Decode [dmin dmax]`; the default is `[0 2^bits-1]`
fn apply_index_decode(indices: &mut [u8], bits: usize, decode: &[f32]) {
    let [lo, hi, ..] = decode else {
        return;
    };
    let max = ((1u32 << bits.min(8)) - 1) as f32;
    if *lo == 0.0 && *hi == max {
        return;
    }

    for index in indices.iter_mut() {
        let value = lo + *index as f32 * (hi - lo) / max;
        *index = value.round().clamp(0.0, 255.0) as u8;
    }
}

fn expand_palette(indices: &[u8], base_channels: usize, hival: u8, lookup: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * base_channels);
    for &index in indices {
        let start = index.min(hival) as usize * base_channels;
        match lookup.get(start..start + base_channels) {
            Some(entry) => out.extend_from_slice(entry),
            None => out.extend(std::iter::repeat(0).take(base_channels)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{add_image, cmyk_jpeg, deflate, gradient_jpeg, gray_jpeg};
    use lopdf::dictionary;

    #[test]
    fn test_decode_raw_rgb() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! { "Width" => 2, "Height" => 1, "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8 },
            vec![255, 0, 0, 0, 0, 255],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (2, 1));
        assert_eq!(pixmap.channels(), 3);
        assert_eq!(pixmap.samples(), &[255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn test_decode_flate_gray() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 3, "Height" => 2, "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8, "Filter" => "FlateDecode",
            },
            deflate(&[1, 2, 3, 4, 5, 6]),
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.samples(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(pixmap.colorspace().name(), "DeviceGray");
    }

    #[test]
    fn test_decode_one_bit_gray_with_row_padding() {
        let mut doc = Document::with_version("1.5");
        // 3 pixels per row: 101 then 010, each row padded to a byte
        let id = add_image(
            &mut doc,
            dictionary! { "Width" => 3, "Height" => 2, "ColorSpace" => "DeviceGray", "BitsPerComponent" => 1 },
            vec![0b1010_0000, 0b0100_0000],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.samples(), &[255, 0, 255, 0, 255, 0]);
    }

    #[test]
    fn test_decode_inverted_decode_array() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 2, "Height" => 1, "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8, "Decode" => vec![Object::Integer(1), Object::Integer(0)],
            },
            vec![0, 255],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.samples(), &[255, 0]);
    }

    #[test]
    fn test_decode_indexed_expands_to_base() {
        let mut doc = Document::with_version("1.5");
        let palette = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(1),
            Object::string_literal(vec![255, 0, 0, 0, 255, 0]),
        ]);
        let id = add_image(
            &mut doc,
            dictionary! { "Width" => 2, "Height" => 1, "ColorSpace" => palette, "BitsPerComponent" => 8 },
            vec![1, 0],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.colorspace().name(), "DeviceRGB");
        assert_eq!(pixmap.samples(), &[0, 255, 0, 255, 0, 0]);
    }

    #[test]
    fn test_decode_cmyk_keeps_four_channels() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! { "Width" => 1, "Height" => 1, "ColorSpace" => "DeviceCMYK", "BitsPerComponent" => 8 },
            vec![0, 0, 0, 255],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.channels(), 4);
    }

    #[test]
    fn test_decode_sixteen_bit_takes_high_byte() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! { "Width" => 2, "Height" => 1, "ColorSpace" => "DeviceGray", "BitsPerComponent" => 16 },
            vec![0x12, 0x34, 0xAB, 0xCD],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.samples(), &[0x12, 0xAB]);
    }

    #[test]
    fn test_decode_dct() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 32, "Height" => 16, "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8, "Filter" => "DCTDecode",
            },
            gradient_jpeg(32, 16),
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (32, 16));
        assert_eq!(pixmap.channels(), 3);
    }

    #[test]
    fn test_decode_dct_applies_inverted_decode() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 8, "Height" => 8, "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8, "Filter" => "DCTDecode",
                "Decode" => vec![Object::Integer(1), Object::Integer(0)],
            },
            gray_jpeg(8, 8, 0),
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.channels(), 1);
        assert!(pixmap.samples().iter().all(|&v| v >= 250));
    }

    #[test]
    fn test_decode_dct_cmyk_comes_back_rgb() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 16, "Height" => 8, "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8, "Filter" => "DCTDecode",
            },
            cmyk_jpeg(16, 8),
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (16, 8));
        assert_eq!(pixmap.channels(), 3);
        assert_eq!(pixmap.colorspace().name(), "DeviceRGB");
    }

    #[test]
    fn test_decode_dct_cmyk_with_decode_array_fails() {
        let mut doc = Document::with_version("1.5");
        let inverted: Vec<Object> = [1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect();
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 16, "Height" => 8, "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8, "Filter" => "DCTDecode", "Decode" => inverted,
            },
            cmyk_jpeg(16, 8),
        );

        assert!(matches!(decode_image(&doc, id), Err(ImageError::Decode(_))));
    }

    #[test]
    fn test_decode_indexed_applies_index_decode() {
        let mut doc = Document::with_version("1.5");
        let palette = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(1),
            Object::string_literal(vec![255, 0, 0, 0, 255, 0]),
        ]);
        // 1-bit indices with [1 0] swap the two palette entries
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 2, "Height" => 1, "ColorSpace" => palette, "BitsPerComponent" => 1,
                "Decode" => vec![Object::Integer(1), Object::Integer(0)],
            },
            vec![0b0100_0000],
        );

        let pixmap = decode_image(&doc, id).unwrap();
        assert_eq!(pixmap.samples(), &[0, 255, 0, 255, 0, 0]);
    }

    #[test]
    fn test_index_decode_default_range_is_identity() {
        let mut indices = vec![0, 3, 7];
        apply_index_decode(&mut indices, 4, &[0.0, 15.0]);
        assert_eq!(indices, vec![0, 3, 7]);
    }

    #[test]
    fn test_truncated_data() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! { "Width" => 4, "Height" => 4, "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8 },
            vec![0; 10],
        );

        assert!(matches!(
            decode_image(&doc, id),
            Err(ImageError::TruncatedData { expected: 48, actual: 10 })
        ));
    }

    #[test]
    fn test_unsupported_filter() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! {
                "Width" => 4, "Height" => 4, "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8, "Filter" => "JPXDecode",
            },
            vec![0; 10],
        );

        assert!(matches!(
            decode_image(&doc, id),
            Err(ImageError::UnsupportedFilter(name)) if name == "JPXDecode"
        ));
    }

    #[test]
    fn test_missing_width() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(
            &mut doc,
            dictionary! { "Height" => 4, "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8 },
            vec![0; 48],
        );

        assert!(matches!(
            decode_image(&doc, id),
            Err(ImageError::MissingDimension("Width"))
        ));
    }

    #[test]
    fn test_not_an_image() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(dictionary! { "Type" => "Font" });
        assert!(matches!(decode_image(&doc, id), Err(ImageError::NotAnImage)));
    }

    #[test]
    fn test_stencil_mask_detection() {
        let stream = Stream::new(dictionary! { "ImageMask" => true }, vec![]);
        assert!(is_stencil_mask(&stream));
        let stream = Stream::new(dictionary! {}, vec![]);
        assert!(!is_stencil_mask(&stream));
    }
}
