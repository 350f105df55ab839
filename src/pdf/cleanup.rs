//! Structural cleanup applied before the document is written.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use sha2::{Digest, Sha256};

use crate::config::{GarbageLevel, SaveOptions};
use crate::error::CompressError;

/// Merging can expose new duplicates (two forms that now point at one image),
/// so it runs to a fixpoint with this many rounds at most
const MAX_MERGE_ROUNDS: usize = 8;

/// What the cleanup pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub empty_streams_removed: usize,
    pub duplicates_merged: usize,
    pub unused_removed: usize,
    pub renumbered: bool,
}

/// Apply `options` to the document in memory
pub fn apply_cleanup(doc: &mut Document, options: &SaveOptions) -> CleanupReport {
    let mut report = CleanupReport::default();

    if options.clean {
        report.empty_streams_removed = delete_empty_streams(doc);
    }

    if options.garbage >= GarbageLevel::MergeObjects {
        let include_streams = options.garbage >= GarbageLevel::MergeStreams;
        for _ in 0..MAX_MERGE_ROUNDS {
            let merged = merge_duplicates(doc, include_streams);
            if merged == 0 {
                break;
            }
            report.duplicates_merged += merged;
        }
    }

    if options.garbage >= GarbageLevel::Unused {
        report.unused_removed = doc.prune_objects().len();
    }

    if options.garbage >= GarbageLevel::Compact {
        doc.renumber_objects();
        report.renumbered = true;
    }

    if options.deflate {
        doc.compress();
    }

    log::debug!("Cleanup: {:?}", report);
    report
}

/// Apply cleanup, then write the document to `path` in one go.
///
/// The file is only created once the whole document has serialized, so a
/// failure leaves no partial output behind.
pub fn save_document(
    doc: &mut Document,
    path: &Path,
    options: &SaveOptions,
) -> Result<CleanupReport, CompressError> {
    let report = apply_cleanup(doc, options);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| CompressError::Save {
            path: path.to_path_buf(),
            source: e,
        })?;
    fs::write(path, buffer)?;

    Ok(report)
}

/// Delete empty streams that nothing draws by name.
///
/// Empty XObjects stay: removing one would leave a dangling `Do` in the
/// content stream that paints it.
fn delete_empty_streams(doc: &mut Document) -> usize {
    let empty: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(&id, obj)| match obj {
            Object::Stream(stream)
                if stream.content.is_empty() && stream.dict.get(b"Subtype").is_err() =>
            {
                Some(id)
            }
            _ => None,
        })
        .collect();

    for &id in &empty {
        doc.delete_object(id);
    }
    empty.len()
}

/// Structural objects that must stay distinct even when identical
fn is_structural(dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page" | b"Pages" | b"Catalog" | b"XRef" | b"ObjStm")
    )
}

fn mergeable(obj: &Object, include_streams: bool) -> bool {
    match obj {
        Object::Dictionary(dict) => !is_structural(dict),
        Object::Array(_) => true,
        Object::Stream(stream) => include_streams && !is_structural(&stream.dict),
        _ => false,
    }
}

/// Collapse identical objects onto the lowest-numbered copy. Returns how many were removed.
fn merge_duplicates(doc: &mut Document, include_streams: bool) -> usize {
    let mut canonical: HashMap<[u8; 32], ObjectId> = HashMap::new();
    let mut remap: BTreeMap<ObjectId, ObjectId> = BTreeMap::new();

    for (&id, obj) in &doc.objects {
        if !mergeable(obj, include_streams) {
            continue;
        }
        match canonical.entry(fingerprint(obj)) {
            Entry::Occupied(keep) => {
                remap.insert(id, *keep.get());
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
    }

    if remap.is_empty() {
        return 0;
    }

    for obj in doc.objects.values_mut() {
        rewrite_references(obj, &remap);
    }
    for (_, value) in doc.trailer.iter_mut() {
        rewrite_references(value, &remap);
    }
    for id in remap.keys() {
        doc.objects.remove(id);
    }

    remap.len()
}

fn fingerprint(obj: &Object) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hash_object(obj, &mut hasher);
    hasher.finalize().into()
}

fn hash_object(obj: &Object, hasher: &mut Sha256) {
    match obj {
        Object::Null => hasher.update(b"n"),
        Object::Boolean(b) => hasher.update(if *b { b"t" } else { b"f" }),
        Object::Integer(i) => {
            hasher.update(b"i");
            hasher.update(i.to_le_bytes());
        }
        Object::Real(r) => {
            hasher.update(b"r");
            hasher.update(r.to_le_bytes());
        }
        Object::Name(name) => hash_bytes(b"/", name, hasher),
        Object::String(bytes, _) => hash_bytes(b"(", bytes, hasher),
        Object::Array(items) => {
            hasher.update(b"[");
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                hash_object(item, hasher);
            }
        }
        Object::Dictionary(dict) => hash_dictionary(dict, hasher),
        Object::Stream(stream) => {
            hasher.update(b"S");
            hash_dictionary(&stream.dict, hasher);
            hash_bytes(b"%", &stream.content, hasher);
        }
        Object::Reference((number, generation)) => {
            hasher.update(b"R");
            hasher.update(number.to_le_bytes());
            hasher.update(generation.to_le_bytes());
        }
    }
}

fn hash_bytes(tag: &[u8], bytes: &[u8], hasher: &mut Sha256) {
    hasher.update(tag);
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn hash_dictionary(dict: &Dictionary, hasher: &mut Sha256) {
    let mut entries: Vec<(&Vec<u8>, &Object)> = dict.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    hasher.update(b"<<");
    hasher.update((entries.len() as u64).to_le_bytes());
    for (key, value) in entries {
        hash_bytes(b"/", key, hasher);
        hash_object(value, hasher);
    }
}

fn rewrite_references(obj: &mut Object, remap: &BTreeMap<ObjectId, ObjectId>) {
    match obj {
        Object::Reference(id) => {
            if let Some(&target) = remap.get(id) {
                *id = target;
            }
        }
        Object::Array(items) => {
            for item in items {
                rewrite_references(item, remap);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                rewrite_references(value, remap);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                rewrite_references(value, remap);
            }
        }
        _ => {}
    }
}
