//! In-memory PDF builders shared by unit tests.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Uncompressed RGB image dictionary and a diagonal gradient
pub fn rgb_image(width: u32, height: u32) -> (Dictionary, Vec<u8>) {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x * 255 / width.max(1)) as u8);
            data.push((y * 255 / height.max(1)) as u8);
            data.push(((x + y) % 256) as u8);
        }
    }
    let dict = dictionary! {
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    (dict, data)
}

/// Uncompressed CMYK image dictionary with a flat ink mix
pub fn cmyk_image(width: u32, height: u32) -> (Dictionary, Vec<u8>) {
    let data = [30u8, 60, 90, 20].repeat((width * height) as usize);
    let dict = dictionary! {
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceCMYK",
        "BitsPerComponent" => 8,
    };
    (dict, data)
}

pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let (_, data) = rgb_image(width, height);
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90)
        .encode(&data, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    jpeg
}

/// Flat gray JPEG where every sample is `value`
pub fn gray_jpeg(width: u32, height: u32, value: u8) -> Vec<u8> {
    let data = vec![value; (width * height) as usize];
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90)
        .encode(&data, width, height, ExtendedColorType::L8)
        .unwrap();
    jpeg
}

/// Four-component (CMYK) JPEG with a flat ink mix
pub fn cmyk_jpeg(width: u16, height: u16) -> Vec<u8> {
    let data = [30u8, 60, 90, 20].repeat(width as usize * height as usize);
    let mut jpeg = Vec::new();
    jpeg_encoder::Encoder::new(&mut jpeg, 90)
        .encode(&data, width, height, jpeg_encoder::ColorType::Cmyk)
        .unwrap();
    jpeg
}

/// Add an image XObject built from `dict` and `content`
pub fn add_image(doc: &mut Document, mut dict: Dictionary, content: Vec<u8>) -> ObjectId {
    dict.set("Type", "XObject");
    dict.set("Subtype", "Image");
    doc.add_object(Stream::new(dict, content))
}

/// Build a page tree with one page per entry, each drawing the listed XObjects.
/// Returns the page ids in order.
pub fn build_pages(doc: &mut Document, pages: &[Vec<ObjectId>]) -> Vec<ObjectId> {
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for xobjects in pages {
        let mut names = Dictionary::new();
        let mut content = Vec::new();
        for (i, &id) in xobjects.iter().enumerate() {
            let name = format!("Im{}", i);
            names.set(name.as_bytes(), id);
            content.extend_from_slice(format!("q 100 0 0 100 0 0 cm /{} Do Q\n", name).as_bytes());
        }
        let contents = doc.add_object(Stream::new(dictionary! {}, content));

        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            "Resources" => dictionary! { "XObject" => names },
            "Contents" => contents,
        });
        kids.push(page);
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );

    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);

    kids
}
