//! Synthetic identifiers for CRD descriptors
//!
//! Descriptors carry an `id` so the editor can reorder them without
//! relying on array positions. Ids are issued on import and stripped on
//! export; they are never derived from content.

use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::manifest::{Manifest, paths};

const DESCRIPTOR_FIELDS: [&str; 2] = ["specDescriptors", "statusDescriptors"];
const CRD_LISTS: [&str; 2] = [paths::OWNED_CRDS, paths::REQUIRED_CRDS];

/// Source of descriptor identifiers
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Counter plus wall-clock timestamp
///
/// The counter keeps ids unique within a process even when two are issued
/// in the same millisecond. Sessions persist `counter` between runs.
#[derive(Debug, Clone, Default)]
pub struct ClockIds {
    pub counter: u64,
}

impl ClockIds {
    pub fn starting_at(counter: u64) -> Self {
        Self { counter }
    }
}

impl IdGenerator for ClockIds {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.counter, Utc::now().timestamp_millis())
    }
}

/// Deterministic ids (`<prefix>-1`, `<prefix>-2`, ...)
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("{}-{}", self.prefix, self.next)
    }
}

/// Copy of `value` without its top-level `id` field
pub fn strip_id(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut map = map.clone();
            map.retain(|key, _| key != "id");
            JsonValue::Object(map)
        }
        other => other.clone(),
    }
}

/// Issue fresh ids to every descriptor of a single CRD entry
pub fn assign_crd_descriptor_ids(crd: &JsonValue, ids: &mut dyn IdGenerator) -> JsonValue {
    map_descriptors(crd, &mut |descriptor| match descriptor {
        JsonValue::Object(map) => {
            let mut map = map.clone();
            map.insert("id".to_string(), JsonValue::String(ids.next_id()));
            JsonValue::Object(map)
        }
        other => other.clone(),
    })
}

/// Remove ids from every descriptor of a single CRD entry
pub fn strip_crd_descriptor_ids(crd: &JsonValue) -> JsonValue {
    map_descriptors(crd, &mut strip_id)
}

/// Issue fresh ids to every descriptor of every owned and required CRD
pub fn assign_descriptor_ids(manifest: &Manifest, ids: &mut dyn IdGenerator) -> Manifest {
    map_crds(manifest, &mut |crd| assign_crd_descriptor_ids(crd, &mut *ids))
}

/// Remove ids from every descriptor of every owned and required CRD
pub fn strip_descriptor_ids(manifest: &Manifest) -> Manifest {
    map_crds(manifest, &mut strip_crd_descriptor_ids)
}

fn map_crds(manifest: &Manifest, f: &mut dyn FnMut(&JsonValue) -> JsonValue) -> Manifest {
    let mut next = manifest.clone();
    for list in CRD_LISTS {
        let Some(JsonValue::Array(crds)) = manifest.get(list) else {
            continue;
        };
        let mapped: Vec<JsonValue> = crds.iter().map(|crd| f(crd)).collect();
        // The path exists and holds an array, so the write cannot fail
        let _ = next.set(list, JsonValue::Array(mapped));
    }
    next
}

fn map_descriptors(crd: &JsonValue, f: &mut dyn FnMut(&JsonValue) -> JsonValue) -> JsonValue {
    let JsonValue::Object(map) = crd else {
        return crd.clone();
    };
    let mut map = map.clone();
    for field in DESCRIPTOR_FIELDS {
        if let Some(JsonValue::Array(descriptors)) = map.get(field) {
            let mapped: Vec<JsonValue> = descriptors.iter().map(|d| f(d)).collect();
            map.insert(field.to_string(), JsonValue::Array(mapped));
        }
    }
    JsonValue::Object(map)
}
