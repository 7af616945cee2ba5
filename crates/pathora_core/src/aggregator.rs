//! crates/pathora_core/src/aggregator.rs
//!
//! Read-time merge of curated resources with the resources embedded in lessons.
//!
//! Nothing here is cached: every call recomputes the listing from the rows it is
//! given, so synthetic ids are only meaningful within one response.

use std::collections::BTreeMap;
use tracing::warn;

use crate::domain::{LessonResourceBlob, ManualResource, RawResource, ResourceEntry};
use crate::resolver::{classify, resolve_offline, SyntheticIds};

/// Decodes one lesson blob, or `None` if it is not a JSON array of resources.
pub fn decode_blob(blob: &LessonResourceBlob) -> Option<Vec<RawResource>> {
    match serde_json::from_str::<Vec<RawResource>>(&blob.ai_resources) {
        Ok(resources) => Some(resources),
        Err(e) => {
            warn!(
                "Skipping malformed ai_resources on lesson {}: {}",
                blob.lesson_id, e
            );
            None
        }
    }
}

/// The category a curated row is listed and counted under. Rows without a
/// category fall back to the same rule used for AI resources.
pub fn manual_category(resource: &ManualResource) -> String {
    match resource.category.as_deref().map(str::trim) {
        Some(category) if !category.is_empty() => category.to_string(),
        _ => classify(&resource.kind).label().to_string(),
    }
}

/// Manual resources in table order, then AI resources in lesson order.
pub fn aggregate(manual: Vec<ManualResource>, blobs: &[LessonResourceBlob]) -> Vec<ResourceEntry> {
    let mut entries: Vec<ResourceEntry> = manual.into_iter().map(ResourceEntry::Manual).collect();
    let mut ids = SyntheticIds::new();

    for blob in blobs {
        let Some(resources) = decode_blob(blob) else {
            continue;
        };
        for raw in &resources {
            entries.push(ResourceEntry::Generated(resolve_offline(
                raw,
                ids.allocate(),
                Some(blob.lesson_id),
            )));
        }
    }
    entries
}

/// Per-category counts over curated rows plus owner-visible AI resources.
pub fn stats(manual: &[ManualResource], blobs: &[LessonResourceBlob]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for resource in manual {
        *counts.entry(manual_category(resource)).or_insert(0) += 1;
    }
    for resources in blobs.iter().filter_map(decode_blob) {
        for raw in &resources {
            *counts.entry(classify(&raw.kind).label().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Whether an entry belongs under `category` (case-insensitive label match).
pub fn in_category(entry: &ResourceEntry, category: &str) -> bool {
    let category = category.trim();
    match entry {
        ResourceEntry::Manual(r) => manual_category(r).eq_ignore_ascii_case(category),
        ResourceEntry::Generated(r) => r.category.label().eq_ignore_ascii_case(category),
    }
}
