//! One-time check that the JPEG and PDF backends work before any file is touched.

use lopdf::{dictionary, Document, Object, Stream};

use crate::error::CompressError;
use crate::model::{ColorSpace, Pixmap};

/// Encode a one-pixel JPEG, embed it in a tiny document and reload that
/// document from memory.
pub fn check_backends() -> Result<(), CompressError> {
    let pixmap = Pixmap::new(1, 1, ColorSpace::DeviceRgb, vec![255, 255, 255])
        .map_err(|e| CompressError::Backend(e.to_string()))?;
    let jpeg = pixmap
        .encode_jpeg(75)
        .map_err(|e| CompressError::Backend(format!("JPEG encoder: {}", e)))?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false),
    );
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(1), Object::Integer(1)],
        "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| CompressError::Backend(format!("PDF writer: {}", e)))?;
    let reloaded =
        Document::load_mem(&buffer).map_err(|e| CompressError::Backend(format!("PDF reader: {}", e)))?;

    if reloaded.get_pages().len() != 1 {
        return Err(CompressError::Backend(
            "PDF round trip lost the test page".to_string(),
        ));
    }

    log::debug!("Backend check passed ({} byte test document)", buffer.len());
    Ok(())
}
