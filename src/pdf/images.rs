//! Find the image XObjects a page uses.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Guard against malformed page trees whose `/Parent` chain loops
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Image reference ids used by a page, in resource order.
///
/// Images drawn inside Form XObjects are included, depth first. Each id
/// appears once per page even if several resource names point at it.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    if let Some(resources) = page_resources(doc, page_id) {
        collect_from_resources(doc, resources, &mut images, &mut seen);
    }

    images
}

/// The page's `/Resources`, inherited from the nearest page-tree ancestor when absent
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node_id = page_id;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(resources) = node.get(b"Resources") {
            return doc.dereference(resources).ok()?.1.as_dict().ok();
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }

    log::debug!("Page {:?} has a page tree deeper than {}", page_id, MAX_INHERITANCE_DEPTH);
    None
}

fn collect_from_resources(
    doc: &Document,
    resources: &Dictionary,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) {
    let xobjects = match resources
        .get(b"XObject")
        .and_then(|x| doc.dereference(x))
        .and_then(|(_, x)| x.as_dict())
    {
        Ok(dict) => dict,
        Err(_) => return,
    };

    for (_, entry) in xobjects.iter() {
        let Ok(id) = entry.as_reference() else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => images.push(id),
            Ok(b"Form") => {
                let nested = stream
                    .dict
                    .get(b"Resources")
                    .and_then(|r| doc.dereference(r))
                    .and_then(|(_, r)| r.as_dict());
                if let Ok(nested) = nested {
                    collect_from_resources(doc, nested, images, seen);
                }
            }
            _ => {}
        }
    }
}
