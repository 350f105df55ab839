//! Stream filter decoding for image data.
//!
//! Only the lossless general-purpose filters are undone here. `DCTDecode` is
//! handed to the JPEG decoder by the caller; every other image codec is
//! reported as unsupported.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object, Stream};
use weezl::{decode::Decoder, BitOrder};

use crate::error::ImageError;

/// Filter names in decoding order, with abbreviations expanded
pub fn filter_chain(doc: &Document, stream: &Stream) -> Result<Vec<Vec<u8>>, ImageError> {
    let filter = match stream.dict.get(b"Filter") {
        Ok(f) => f,
        Err(_) => return Ok(Vec::new()),
    };

    let resolved = doc
        .dereference(filter)
        .map(|(_, o)| o)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let names: Vec<&[u8]> = match resolved {
        Object::Name(name) => vec![name.as_slice()],
        Object::Array(items) => items.iter().filter_map(|f| f.as_name().ok()).collect(),
        _ => return Err(ImageError::Decode("malformed /Filter".to_string())),
    };

    Ok(names.into_iter().map(expand_abbreviation).collect())
}

fn expand_abbreviation(name: &[u8]) -> Vec<u8> {
    let full: &[u8] = match name {
        b"Fl" => b"FlateDecode",
        b"LZW" => b"LZWDecode",
        b"DCT" => b"DCTDecode",
        b"AHx" => b"ASCIIHexDecode",
        b"A85" => b"ASCII85Decode",
        b"RL" => b"RunLengthDecode",
        b"CCF" => b"CCITTFaxDecode",
        other => other,
    };
    full.to_vec()
}

/// `/DecodeParms` entry matching filter `index`, if it is a dictionary
fn decode_parms<'a>(doc: &'a Document, stream: &'a Stream, index: usize) -> Option<&'a Dictionary> {
    let parms = stream.dict.get(b"DecodeParms").ok()?;
    let parms = doc.dereference(parms).ok()?.1;
    match parms {
        Object::Dictionary(dict) => (index == 0).then_some(dict),
        Object::Array(items) => {
            let entry = doc.dereference(items.get(index)?).ok()?.1;
            entry.as_dict().ok()
        }
        _ => None,
    }
}

/// Undo the lossless filters in `filters` (all of which must be Flate or LZW)
pub fn decode_lossless(
    doc: &Document,
    stream: &Stream,
    filters: &[Vec<u8>],
) -> Result<Vec<u8>, ImageError> {
    let mut data = stream.content.clone();

    for (index, filter) in filters.iter().enumerate() {
        let parms = decode_parms(doc, stream, index);
        data = match filter.as_slice() {
            b"FlateDecode" => inflate(&data)?,
            b"LZWDecode" => {
                let early_change = parms
                    .and_then(|p| p.get(b"EarlyChange").ok())
                    .and_then(|e| e.as_i64().ok())
                    .unwrap_or(1);
                lzw_decode(&data, early_change)?
            }
            other => {
                return Err(ImageError::UnsupportedFilter(
                    String::from_utf8_lossy(other).into_owned(),
                ))
            }
        };

        if let Some(parms) = parms {
            data = apply_predictor(data, parms)?;
        }
    }

    Ok(data)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ImageError::Decode(format!("FlateDecode: {}", e)))?;
    Ok(out)
}

fn lzw_decode(data: &[u8], early_change: i64) -> Result<Vec<u8>, ImageError> {
    let mut decoder = if early_change == 0 {
        Decoder::new(BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };
    let mut out = Vec::new();
    decoder
        .into_vec(&mut out)
        .decode(data)
        .status
        .map_err(|e| ImageError::Decode(format!("LZWDecode: {}", e)))?;
    Ok(out)
}

fn parm(parms: &Dictionary, key: &[u8], default: i64) -> i64 {
    parms
        .get(key)
        .and_then(Object::as_i64)
        .unwrap_or(default)
}

/// Reverse TIFF (2) or PNG (10-15) prediction
fn apply_predictor(data: Vec<u8>, parms: &Dictionary) -> Result<Vec<u8>, ImageError> {
    let predictor = parm(parms, b"Predictor", 1);
    if predictor < 2 {
        return Ok(data);
    }

    let colors = parm(parms, b"Colors", 1).max(1) as usize;
    let bits = parm(parms, b"BitsPerComponent", 8).max(1) as usize;
    let columns = parm(parms, b"Columns", 1).max(1) as usize;

    let row_bytes = (colors * bits * columns).div_ceil(8);
    let bpp = (colors * bits).div_ceil(8).max(1);

    match predictor {
        2 => Ok(undo_tiff_predictor(data, row_bytes, bpp, bits)),
        10..=15 => undo_png_predictor(&data, row_bytes, bpp),
        other => Err(ImageError::Decode(format!("unknown predictor {}", other))),
    }
}

fn undo_tiff_predictor(mut data: Vec<u8>, row_bytes: usize, bpp: usize, bits: usize) -> Vec<u8> {
    // Sub-byte TIFF prediction is vanishingly rare in image streams
    if bits != 8 {
        return data;
    }
    for row in data.chunks_mut(row_bytes) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    data
}

fn undo_png_predictor(data: &[u8], row_bytes: usize, bpp: usize) -> Result<Vec<u8>, ImageError> {
    let row_size = row_bytes + 1;
    let mut out = Vec::with_capacity(data.len() / row_size * row_bytes);
    let mut prev = vec![0u8; row_bytes];
    let mut current = vec![0u8; row_bytes];

    for chunk in data.chunks(row_size) {
        if chunk.len() < row_size {
            break;
        }
        let (kind, row) = (chunk[0], &chunk[1..]);

        for i in 0..row_bytes {
            let left = if i >= bpp { current[i - bpp] } else { 0 };
            let above = prev[i];
            let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };

            let predicted = match kind {
                0 => 0,
                1 => left,
                2 => above,
                3 => ((left as u16 + above as u16) / 2) as u8,
                4 => paeth(left, above, upper_left),
                other => {
                    return Err(ImageError::Decode(format!(
                        "invalid PNG row filter {}",
                        other
                    )))
                }
            };
            current[i] = row[i].wrapping_add(predicted);
        }

        out.extend_from_slice(&current);
        std::mem::swap(&mut prev, &mut current);
    }

    Ok(out)
}

fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let (a, b, c) = (left as i16, above as i16, upper_left as i16);
    let p = a + b - c;
    let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}
