//! `alm-examples` annotation adapter
//!
//! The annotation holds a JSON-encoded array of example custom resources
//! as a plain string. This module is the only place that converts between
//! that string and structured values.

use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::manifest::{Manifest, paths};
use crate::merge::merge_by_key;
use crate::placeholder::{PlaceholderKind, strip_placeholder};

/// Decode the annotation string into example objects
///
/// An empty string decodes to no examples.
pub fn decode_examples(annotation: &str) -> Result<Vec<JsonValue>> {
    if annotation.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(annotation)? {
        JsonValue::Array(items) => Ok(items),
        other => Err(CoreError::InvalidDocument {
            message: format!("alm-examples must be a JSON array, found {}", type_name(&other)),
        }),
    }
}

/// Encode examples back into the annotation string
pub fn encode_examples(examples: &[JsonValue]) -> String {
    serde_json::to_string_pretty(examples).unwrap_or_else(|_| "[]".to_string())
}

/// Examples currently stored in the manifest
///
/// A missing or malformed annotation yields no examples.
pub fn examples_of(manifest: &Manifest) -> Vec<JsonValue> {
    match manifest.get(paths::ALM_EXAMPLES) {
        Some(JsonValue::String(annotation)) => decode_examples(annotation).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed alm-examples annotation");
            Vec::new()
        }),
        Some(JsonValue::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Copy of the manifest with `examples` stored in the annotation
pub fn with_examples(manifest: &Manifest, examples: &[JsonValue]) -> Manifest {
    let mut next = manifest.clone();
    let _ = next.set(
        paths::ALM_EXAMPLES,
        JsonValue::String(encode_examples(examples)),
    );
    next
}

/// Merge example lists by `kind`, dropping the scaffold once real examples exist
pub fn merge_examples(initial: &[JsonValue], updated: &[JsonValue]) -> Vec<JsonValue> {
    let merged = merge_by_key(
        &JsonValue::Array(initial.to_vec()),
        &JsonValue::Array(updated.to_vec()),
        "kind",
        None,
    );
    match merged {
        JsonValue::Array(items) => strip_placeholder(&items, PlaceholderKind::AlmExample),
        _ => initial.to_vec(),
    }
}

/// Merge two raw annotation values
///
/// Returns `None` when neither side carries an annotation. An undecodable
/// side is treated the way [`merge_by_key`] treats non-array input.
pub fn merge_annotations(
    initial: Option<&JsonValue>,
    updated: Option<&JsonValue>,
) -> Option<String> {
    let decode = |value: Option<&JsonValue>| -> Option<Vec<JsonValue>> {
        match value? {
            JsonValue::String(s) => match decode_examples(s) {
                Ok(items) => Some(items),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed alm-examples annotation");
                    None
                }
            },
            JsonValue::Array(items) => Some(items.clone()),
            _ => None,
        }
    };

    match (decode(initial), decode(updated)) {
        (Some(a), Some(b)) => Some(encode_examples(&merge_examples(&a, &b))),
        (Some(a), None) => Some(encode_examples(&a)),
        (None, Some(b)) => Some(encode_examples(&merge_examples(&[], &b))),
        (None, None) => None,
    }
}

/// Fold a single example custom resource into the manifest
pub fn merge_example(manifest: &Manifest, example: JsonValue) -> Manifest {
    let merged = merge_examples(&examples_of(manifest), &[example]);
    with_examples(manifest, &merged)
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder;
    use serde_json::json;

    #[test]
    fn test_decode_examples() {
        let examples = decode_examples(r#"[{"kind": "EtcdCluster"}]"#).unwrap();
        assert_eq!(examples, vec![json!({"kind": "EtcdCluster"})]);

        assert!(decode_examples("").unwrap().is_empty());
        assert!(decode_examples(r#"{"kind": "x"}"#).is_err());
        assert!(decode_examples("[{").is_err());
    }

    #[test]
    fn test_with_examples_stores_string() {
        let manifest = placeholder::default_manifest();
        let updated = with_examples(&manifest, &[json!({"kind": "Foo"})]);

        assert!(updated.get(paths::ALM_EXAMPLES).unwrap().is_string());
        assert_eq!(examples_of(&updated), vec![json!({"kind": "Foo"})]);
    }

    #[test]
    fn test_merge_examples_by_kind() {
        let initial = vec![placeholder::alm_example(), json!({"kind": "A", "spec": {"size": 1}})];
        let updated = vec![json!({"kind": "A", "spec": {"size": 3}}), json!({"kind": "B"})];

        let merged = merge_examples(&initial, &updated);

        assert_eq!(
            merged,
            vec![json!({"kind": "A", "spec": {"size": 3}}), json!({"kind": "B"})]
        );
    }

    #[test]
    fn test_merge_annotations_with_malformed_side() {
        let good = json!(r#"[{"kind": "A"}]"#);
        let bad = json!("not json");

        let merged = merge_annotations(Some(&good), Some(&bad)).unwrap();
        assert_eq!(decode_examples(&merged).unwrap(), vec![json!({"kind": "A"})]);

        assert!(merge_annotations(None, None).is_none());
    }

    #[test]
    fn test_merge_annotations_drops_placeholder_without_current() {
        let updated = JsonValue::String(encode_examples(&[
            placeholder::alm_example(),
            json!({"kind": "A"}),
        ]));

        let merged = merge_annotations(None, Some(&updated)).unwrap();
        assert_eq!(decode_examples(&merged).unwrap(), vec![json!({"kind": "A"})]);

        let bad = json!("not json");
        let merged = merge_annotations(Some(&bad), Some(&updated)).unwrap();
        assert_eq!(decode_examples(&merged).unwrap(), vec![json!({"kind": "A"})]);
    }

    #[test]
    fn test_merge_example_into_manifest() {
        let manifest = placeholder::default_manifest();
        let manifest = merge_example(&manifest, json!({"kind": "Foo", "spec": {}}));
        let manifest = merge_example(&manifest, json!({"kind": "Foo", "spec": {"size": 2}}));

        assert_eq!(
            examples_of(&manifest),
            vec![json!({"kind": "Foo", "spec": {"size": 2}})]
        );
    }
}
