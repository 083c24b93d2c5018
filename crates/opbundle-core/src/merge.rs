//! Key-based reconciliation of manifest arrays
//!
//! Uploaded fragments are folded into the current manifest with
//! [`merge_by_key`]: elements sharing the same identity key are merged,
//! new ones are appended, and nothing from the current manifest is lost.
//!
//! Rules of the default structural merge ([`deep_merge`]):
//! - Scalars: overlay replaces base
//! - Objects: recursive merge
//! - Arrays: overlay replaces base (not appended)

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::examples;
use crate::manifest::{Manifest, OwnedCrd, paths};
use crate::placeholder::{PlaceholderKind, strip_placeholder};

/// Merger for two elements sharing the same key: `(existing, incoming)`
pub type ItemMerger<'a> = dyn Fn(&JsonValue, &JsonValue) -> JsonValue + 'a;

/// Deep merge `overlay` into `base` in place
pub fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Deep merge returning a new value
pub fn deep_merged(base: &JsonValue, overlay: &JsonValue) -> JsonValue {
    let mut result = base.clone();
    deep_merge(&mut result, overlay);
    result
}

/// Merge two arrays by the value of `key_field`
///
/// The result keeps the order of `initial`; elements of `updated` with an
/// unseen key are appended in the order they are encountered. Elements
/// with a known key are combined with `merger`, or [`deep_merged`] when
/// no merger is given. Elements without a key are appended verbatim.
///
/// Malformed input is passed through: a non-array `updated` yields
/// `initial`, a non-array `initial` yields `updated`.
pub fn merge_by_key(
    initial: &JsonValue,
    updated: &JsonValue,
    key_field: &str,
    merger: Option<&ItemMerger<'_>>,
) -> JsonValue {
    let Some(updated_items) = updated.as_array() else {
        if !updated.is_null() {
            warn!(key_field, "Ignoring non-array update while merging");
        }
        return initial.clone();
    };
    let Some(initial_items) = initial.as_array() else {
        if !initial.is_null() {
            warn!(key_field, "Replacing non-array value while merging");
        }
        return updated.clone();
    };

    let mut keyed: IndexMap<String, JsonValue> = IndexMap::new();
    let mut anonymous = 0usize;
    let mut slot = |item: &JsonValue| match key_of(item, key_field) {
        Some(key) => key,
        None => {
            anonymous += 1;
            format!("\u{0}anonymous-{}", anonymous)
        }
    };

    for item in initial_items {
        let key = slot(item);
        keyed.insert(key, item.clone());
    }

    for item in updated_items {
        let key = slot(item);
        match keyed.get_mut(&key) {
            Some(existing) => {
                debug!(key_field, key = %key, "Merging element with existing key");
                *existing = match merger {
                    Some(merge) => merge(existing, item),
                    None => deep_merged(existing, item),
                };
            }
            None => {
                keyed.insert(key, item.clone());
            }
        }
    }

    JsonValue::Array(keyed.into_values().collect())
}

fn key_of(item: &JsonValue, key_field: &str) -> Option<String> {
    match item.get(key_field)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn without_placeholder(merged: JsonValue, kind: PlaceholderKind) -> JsonValue {
    match merged {
        JsonValue::Array(items) => JsonValue::Array(strip_placeholder(&items, kind)),
        other => other,
    }
}

// =========================================================================
// Specializations
// =========================================================================

/// Merge a single CRD entry
///
/// Scalar and object fields are deep merged; descriptors are merged by
/// `path` and resources by `kind` instead of being replaced.
pub fn merge_crd(existing: &JsonValue, incoming: &JsonValue) -> JsonValue {
    let mut merged = deep_merged(existing, incoming);

    let keyed_fields = [
        ("specDescriptors", "path"),
        ("statusDescriptors", "path"),
        ("resources", "kind"),
    ];

    for (field, key) in keyed_fields {
        let before = existing.get(field).unwrap_or(&JsonValue::Null);
        let after = incoming.get(field).unwrap_or(&JsonValue::Null);
        let combined = merge_by_key(before, after, key, None);
        let combined = if key == "path" {
            without_placeholder(combined, PlaceholderKind::Descriptor)
        } else {
            combined
        };
        if combined.is_null() {
            continue;
        }
        if let JsonValue::Object(map) = &mut merged {
            map.insert(field.to_string(), combined);
        }
    }

    merged
}

/// Merge CRD lists by `kind`, dropping the scaffold entry once real CRDs exist
pub fn merge_crds(initial: &JsonValue, updated: &JsonValue) -> JsonValue {
    let merged = merge_by_key(initial, updated, "kind", Some(&merge_crd));
    without_placeholder(merged, PlaceholderKind::Crd)
}

/// Merge permission lists by `serviceAccountName`
///
/// Rules are not identity-bearing, so the structural merge replaces them.
pub fn merge_permissions(initial: &JsonValue, updated: &JsonValue) -> JsonValue {
    merge_by_key(initial, updated, "serviceAccountName", None)
}

/// Merge deployment lists by `name`; a matching deployment is replaced whole
pub fn merge_deployments(initial: &JsonValue, updated: &JsonValue) -> JsonValue {
    let replace = |_: &JsonValue, incoming: &JsonValue| incoming.clone();
    let merged = merge_by_key(initial, updated, "name", Some(&replace));
    without_placeholder(merged, PlaceholderKind::Deployment)
}

/// Fold an uploaded ClusterServiceVersion into the current manifest
///
/// Everything is deep merged, then the identity-bearing lists are
/// recomputed from both sides with their key-based mergers.
pub fn merge_manifests(current: &Manifest, uploaded: &Manifest) -> Manifest {
    let mut merged = Manifest::from_value(deep_merged(current.inner(), uploaded.inner()));

    let lists: [(&str, fn(&JsonValue, &JsonValue) -> JsonValue); 5] = [
        (paths::OWNED_CRDS, merge_crds),
        (paths::REQUIRED_CRDS, merge_crds),
        (paths::DEPLOYMENTS, merge_deployments),
        (paths::PERMISSIONS, merge_permissions),
        (paths::CLUSTER_PERMISSIONS, merge_permissions),
    ];

    for (path, merge) in lists {
        let before = current.get(path).unwrap_or(&JsonValue::Null);
        let after = uploaded.get(path).unwrap_or(&JsonValue::Null);
        let combined = merge(before, after);
        if !combined.is_null() {
            // Non-empty dotted path, cannot fail
            let _ = merged.set(path, combined);
        }
    }

    let examples = examples::merge_annotations(
        current.get(paths::ALM_EXAMPLES),
        uploaded.get(paths::ALM_EXAMPLES),
    );
    if let Some(examples) = examples {
        let _ = merged.set(paths::ALM_EXAMPLES, JsonValue::String(examples));
    }

    merged
}

/// Fold a single owned CRD into the manifest
pub fn merge_owned_crd(current: &Manifest, crd: JsonValue) -> Manifest {
    merge_list(current, paths::OWNED_CRDS, JsonValue::Array(vec![crd]), merge_crds)
}

/// Fold a single deployment into the manifest
pub fn merge_deployment(current: &Manifest, deployment: JsonValue) -> Manifest {
    merge_list(
        current,
        paths::DEPLOYMENTS,
        JsonValue::Array(vec![deployment]),
        merge_deployments,
    )
}

/// Fold permissions into `permissions` or `clusterPermissions`
pub fn merge_permission_list(current: &Manifest, path: &str, permissions: JsonValue) -> Manifest {
    merge_list(current, path, permissions, merge_permissions)
}

/// Owned CRD entry describing an uploaded CustomResourceDefinition
///
/// The version is `spec.version` when set, otherwise the first served
/// entry of `spec.versions` (or the first entry when none is served).
pub fn crd_from_definition(definition: &JsonValue) -> JsonValue {
    let name = definition
        .pointer("/metadata/name")
        .and_then(|n| n.as_str())
        .unwrap_or_default();
    let kind = definition
        .pointer("/spec/names/kind")
        .and_then(|k| k.as_str())
        .unwrap_or_default();
    let display_name = definition
        .pointer("/metadata/annotations/displayName")
        .and_then(|d| d.as_str())
        .unwrap_or(kind);

    let versions = definition
        .pointer("/spec/versions")
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[]);
    let selected = versions
        .iter()
        .find(|v| v.get("served").and_then(|s| s.as_bool()).unwrap_or(false))
        .or_else(|| versions.first());
    let version = definition
        .pointer("/spec/version")
        .and_then(|v| v.as_str())
        .or_else(|| selected.and_then(|v| v.get("name")?.as_str()))
        .unwrap_or_default();

    let storage = versions
        .iter()
        .find(|v| v.get("storage").and_then(|s| s.as_bool()).unwrap_or(false))
        .or(selected);
    let description = storage
        .and_then(|v| v.pointer("/schema/openAPIV3Schema/description"))
        .or_else(|| definition.pointer("/spec/validation/openAPIV3Schema/description"))
        .and_then(|d| d.as_str())
        .unwrap_or_default();

    debug!(name, kind, version, "Converted CustomResourceDefinition to owned CRD");

    let crd = OwnedCrd {
        name: name.to_string(),
        kind: kind.to_string(),
        version: version.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        ..OwnedCrd::default()
    };
    serde_json::to_value(crd).unwrap_or_default()
}

fn merge_list(
    current: &Manifest,
    path: &str,
    updated: JsonValue,
    merge: fn(&JsonValue, &JsonValue) -> JsonValue,
) -> Manifest {
    let before = current.get(path).unwrap_or(&JsonValue::Null);
    let mut next = current.clone();
    let _ = next.set(path, merge(before, &updated));
    next
}
