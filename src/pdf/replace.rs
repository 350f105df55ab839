use lopdf::{Document, Object, ObjectId, Stream};

use super::decode::is_stencil_mask;
use crate::error::ImageError;
use crate::model::{ColorSpace, Pixmap};

/// Keys describing the old encoding; everything else on the image dictionary is kept
const ENCODING_KEYS: [&[u8]; 8] = [
    b"Filter",
    b"DecodeParms",
    b"Decode",
    b"Length",
    b"Width",
    b"Height",
    b"ColorSpace",
    b"BitsPerComponent",
];

/// Swap the stream stored at `id` for `jpeg`, in place.
///
/// Every existing reference to `id` keeps pointing at the image. Returns the
/// length of the stream that was replaced.
pub fn replace_image(
    doc: &mut Document,
    id: ObjectId,
    pixmap: &Pixmap,
    jpeg: Vec<u8>,
) -> Result<usize, ImageError> {
    let stream = doc
        .get_object_mut(id)
        .and_then(Object::as_stream_mut)
        .map_err(|e| ImageError::Replace(e.to_string()))?;

    if !matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image")) {
        return Err(ImageError::Replace(format!("{:?} is not an image", id)));
    }
    if is_stencil_mask(stream) {
        return Err(ImageError::Replace(format!("{:?} is a stencil mask", id)));
    }

    let mut dict = stream.dict.clone();
    for key in ENCODING_KEYS {
        // Lab samples are stored unmapped, so their ranges still apply
        if key == b"Decode" && matches!(pixmap.colorspace(), ColorSpace::Lab(_)) {
            continue;
        }
        dict.remove(key);
    }
    // Color-key masks name sample values of the old encoding
    if matches!(dict.get(b"Mask"), Ok(Object::Array(_))) {
        dict.remove(b"Mask");
    }

    dict.set("Width", pixmap.width() as i64);
    dict.set("Height", pixmap.height() as i64);
    dict.set("ColorSpace", pixmap.colorspace().to_object());
    dict.set("BitsPerComponent", 8);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    let original_len = stream.content.len();
    *stream = Stream::new(dict, jpeg).with_compression(false);

    Ok(original_len)
}
