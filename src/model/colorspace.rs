use std::fmt;

use lopdf::{Document, Object};

use crate::error::ImageError;

/// Color space of an image XObject, reduced to what materialization needs
#[derive(Debug, Clone)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    /// `[/CalGray dict]`, kept verbatim for re-emission
    CalGray(Object),
    /// `[/CalRGB dict]`, kept verbatim for re-emission
    CalRgb(Object),
    /// `[/Lab dict]`, kept verbatim for re-emission
    Lab(Object),
    /// `[/ICCBased stream]` with its component count
    IccBased { n: u8, source: Object },
    /// Palette image; samples are indices into `lookup`
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    /// Number of color components per pixel
    pub fn channels(&self) -> usize {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray(_) => 1,
            ColorSpace::DeviceRgb | ColorSpace::CalRgb(_) | ColorSpace::Lab(_) => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::IccBased { n, .. } => *n as usize,
            ColorSpace::Indexed { .. } => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRgb => "DeviceRGB",
            ColorSpace::DeviceCmyk => "DeviceCMYK",
            ColorSpace::CalGray(_) => "CalGray",
            ColorSpace::CalRgb(_) => "CalRGB",
            ColorSpace::Lab(_) => "Lab",
            ColorSpace::IccBased { .. } => "ICCBased",
            ColorSpace::Indexed { .. } => "Indexed",
        }
    }

    /// The PDF object to write as `/ColorSpace` for this space
    pub fn to_object(&self) -> Object {
        match self {
            ColorSpace::DeviceGray => Object::Name(b"DeviceGray".to_vec()),
            ColorSpace::DeviceRgb => Object::Name(b"DeviceRGB".to_vec()),
            ColorSpace::DeviceCmyk => Object::Name(b"DeviceCMYK".to_vec()),
            ColorSpace::CalGray(source)
            | ColorSpace::CalRgb(source)
            | ColorSpace::Lab(source)
            | ColorSpace::IccBased { source, .. } => source.clone(),
            ColorSpace::Indexed { base, hival, lookup } => Object::Array(vec![
                Object::Name(b"Indexed".to_vec()),
                base.to_object(),
                Object::Integer(*hival as i64),
                Object::string_literal(lookup.clone()),
            ]),
        }
    }

    /// Resolve a `/ColorSpace` entry, following references
    pub fn from_object(doc: &Document, obj: &Object) -> Result<Self, ImageError> {
        match obj {
            Object::Reference(id) => {
                let resolved = doc
                    .get_object(*id)
                    .map_err(|e| ImageError::UnsupportedColorSpace(e.to_string()))?;
                Self::from_object(doc, resolved)
            }
            Object::Name(name) => Self::from_name(name),
            Object::Array(items) => Self::from_array(doc, obj, items),
            _ => Err(ImageError::UnsupportedColorSpace(
                "not a name or array".to_string(),
            )),
        }
    }

    fn from_name(name: &[u8]) -> Result<Self, ImageError> {
        match name {
            b"DeviceGray" | b"G" => Ok(ColorSpace::DeviceGray),
            b"DeviceRGB" | b"RGB" => Ok(ColorSpace::DeviceRgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::DeviceCmyk),
            other => Err(ImageError::UnsupportedColorSpace(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    fn from_array(doc: &Document, source: &Object, items: &[Object]) -> Result<Self, ImageError> {
        let family = items
            .first()
            .and_then(|f| f.as_name().ok())
            .ok_or_else(|| ImageError::UnsupportedColorSpace("empty array".to_string()))?;

        match family {
            b"CalGray" => Ok(ColorSpace::CalGray(source.clone())),
            b"CalRGB" => Ok(ColorSpace::CalRgb(source.clone())),
            b"Lab" => Ok(ColorSpace::Lab(source.clone())),
            b"ICCBased" => {
                let stream = items
                    .get(1)
                    .and_then(|s| doc.dereference(s).ok())
                    .and_then(|(_, s)| s.as_stream().ok())
                    .ok_or_else(|| {
                        ImageError::UnsupportedColorSpace("ICCBased without profile".to_string())
                    })?;
                let n = stream.dict.get(b"N").and_then(Object::as_i64).unwrap_or(0);
                match n {
                    1 | 3 | 4 => Ok(ColorSpace::IccBased {
                        n: n as u8,
                        source: source.clone(),
                    }),
                    other => Err(ImageError::UnsupportedColorSpace(format!(
                        "ICCBased with {} components",
                        other
                    ))),
                }
            }
            b"Indexed" | b"I" => Self::indexed(doc, items),
            // Single-element arrays like [/DeviceRGB]
            name if items.len() == 1 => Self::from_name(name),
            other => Err(ImageError::UnsupportedColorSpace(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    fn indexed(doc: &Document, items: &[Object]) -> Result<Self, ImageError> {
        if items.len() != 4 {
            return Err(ImageError::UnsupportedColorSpace(
                "malformed Indexed array".to_string(),
            ));
        }

        let base = Self::from_object(doc, &items[1])?;
        if matches!(base, ColorSpace::Indexed { .. }) {
            return Err(ImageError::UnsupportedColorSpace(
                "nested Indexed".to_string(),
            ));
        }

        let hival = match doc.dereference(&items[2]).map(|(_, o)| o.as_i64()) {
            Ok(Ok(v)) if (0..=255).contains(&v) => v as u8,
            _ => {
                return Err(ImageError::UnsupportedColorSpace(
                    "Indexed hival out of range".to_string(),
                ))
            }
        };

        let lookup = match doc.dereference(&items[3]) {
            Ok((_, Object::String(bytes, _))) => bytes.clone(),
            Ok((_, Object::Stream(stream))) => stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
            _ => {
                return Err(ImageError::UnsupportedColorSpace(
                    "Indexed lookup table missing".to_string(),
                ))
            }
        };

        Ok(ColorSpace::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        })
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpace::IccBased { n, .. } => write!(f, "ICCBased({})", n),
            ColorSpace::Indexed { base, hival, .. } => {
                write!(f, "Indexed({}, {})", base, *hival as u16 + 1)
            }
            other => write!(f, "{}", other.name()),
        }
    }
}
