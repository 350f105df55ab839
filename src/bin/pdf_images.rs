//! Debug tool listing the images each page draws
//! Run with: cargo run --bin pdf_images -- <file.pdf>

use anyhow::{bail, Context, Result};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;
use std::env;

use pdf_compress::model::ColorSpace;
use pdf_compress::pdf::filters::filter_chain;
use pdf_compress::pdf::{image_stream, is_stencil_mask, page_images};

fn main() -> Result<()> {
    let Some(path) = env::args().nth(1) else {
        bail!("usage: pdf_images <file.pdf>");
    };

    let doc = Document::load(&path).with_context(|| format!("Failed to load {}", path))?;
    let pages = doc.get_pages();

    // How many pages reference each image
    let mut usage: HashMap<ObjectId, usize> = HashMap::new();
    let per_page: Vec<(u32, Vec<ObjectId>)> = pages
        .iter()
        .map(|(&number, &page_id)| (number, page_images(&doc, page_id)))
        .collect();
    for (_, images) in &per_page {
        for &id in images {
            *usage.entry(id).or_default() += 1;
        }
    }

    println!("{}: {} pages, {} distinct images", path, pages.len(), usage.len());

    let mut total_bytes = 0usize;
    for (number, images) in &per_page {
        println!("Page {}", number);
        for &id in images {
            let Ok(stream) = image_stream(&doc, id) else {
                println!("  {:>4} {:<3} <not an image>", id.0, id.1);
                continue;
            };
            let dim = |key: &[u8]| {
                stream
                    .dict
                    .get(key)
                    .and_then(Object::as_i64)
                    .unwrap_or(0)
            };
            let colorspace = if is_stencil_mask(stream) {
                "stencil".to_string()
            } else {
                stream
                    .dict
                    .get(b"ColorSpace")
                    .ok()
                    .map(|cs| match ColorSpace::from_object(&doc, cs) {
                        Ok(cs) => cs.to_string(),
                        Err(e) => format!("? ({})", e),
                    })
                    .unwrap_or_else(|| "none".to_string())
            };
            let filters = filter_chain(&doc, stream)
                .map(|chain| {
                    chain
                        .iter()
                        .map(|f| String::from_utf8_lossy(f).into_owned())
                        .collect::<Vec<_>>()
                        .join("+")
                })
                .unwrap_or_else(|e| format!("? ({})", e));
            let shared = usage.get(&id).copied().unwrap_or(0);

            total_bytes += stream.content.len();
            println!(
                "  {:>4} {:<3} {:>5}x{:<5} {:<14} {:<24} {:>10} bytes{}",
                id.0,
                id.1,
                dim(b"Width"),
                dim(b"Height"),
                colorspace,
                if filters.is_empty() { "raw".to_string() } else { filters },
                stream.content.len(),
                if shared > 1 {
                    format!("  (shared by {} pages)", shared)
                } else {
                    String::new()
                }
            );
        }
    }

    println!("Image data: {} bytes (shared images counted per page)", total_bytes);
    Ok(())
}
