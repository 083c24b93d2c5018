//! Recursive evaluation of validator trees

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::borrow::Cow;

use super::error::{EntryError, FieldError, ItemError};
use super::node::{
    ArrayRule, LeafCheck, LeafRule, ObjectPropsRule, REQUIRED_LIST_MESSAGE, REQUIRED_MESSAGE,
    ValidatorNode,
};

/// Evaluate `value` against `node`
///
/// `document` is the whole document being validated; contextual rules
/// receive it to look at sibling fields.
pub fn evaluate(value: &JsonValue, node: &ValidatorNode, document: &JsonValue) -> Option<FieldError> {
    match node {
        ValidatorNode::Leaf(rule) => evaluate_leaf(value, rule),
        ValidatorNode::ArrayOf(rule) => evaluate_array(value, rule, document),
        ValidatorNode::ObjectProps(rule) => evaluate_object_props(value, rule, document),
        ValidatorNode::Contextual(rule) => (rule.check)(value, document, rule),
        ValidatorNode::Fields(fields) => evaluate_fields(value, fields, document),
    }
}

/// Full error tree of a document, or `None` when it is valid
pub fn validate_all(document: &JsonValue, tree: &ValidatorNode) -> Option<FieldError> {
    evaluate(document, tree, document)
}

/// First failing field in depth-first order, with its dotted path
///
/// Stops at the first error instead of building the full tree.
pub fn first_error(document: &JsonValue, tree: &ValidatorNode) -> Option<(String, FieldError)> {
    first_error_at(document, tree, document, String::new())
}

fn first_error_at(
    value: &JsonValue,
    node: &ValidatorNode,
    document: &JsonValue,
    path: String,
) -> Option<(String, FieldError)> {
    let ValidatorNode::Fields(fields) = node else {
        return evaluate(value, node, document).map(|error| (path, error));
    };

    for (name, child) in fields {
        let child_value = value.get(name).unwrap_or(&JsonValue::Null);
        let child_path = if path.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", path, name)
        };
        if let Some(found) = first_error_at(child_value, child, document, child_path) {
            return Some(found);
        }
    }
    None
}

/// Whether a value counts as not filled in
pub fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => false,
    }
}

fn evaluate_leaf(value: &JsonValue, rule: &LeafRule) -> Option<FieldError> {
    if is_empty_value(value) {
        return rule.required.then(|| {
            FieldError::message(rule.required_message.as_deref().unwrap_or(REQUIRED_MESSAGE))
        });
    }

    match &rule.check {
        LeafCheck::None => None,
        LeafCheck::Regex { pattern, message } => match scalar_text(value) {
            Some(text) if pattern.is_match(&text) => None,
            _ => Some(FieldError::message(message.as_str())),
        },
        LeafCheck::Callback(check) => check(value).map(FieldError::Message),
    }
}

fn scalar_text(value: &JsonValue) -> Option<Cow<'_, str>> {
    match value {
        JsonValue::String(s) => Some(Cow::Borrowed(s.as_str())),
        JsonValue::Number(n) => Some(Cow::Owned(n.to_string())),
        JsonValue::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn evaluate_array(value: &JsonValue, rule: &ArrayRule, document: &JsonValue) -> Option<FieldError> {
    let items: &[JsonValue] = match value {
        JsonValue::Null => &[],
        JsonValue::Array(items) => items,
        _ => return Some(FieldError::message("Must be a list")),
    };

    if items.is_empty() {
        return rule.required.then(|| {
            FieldError::message(rule.required_message.as_deref().unwrap_or(REQUIRED_LIST_MESSAGE))
        });
    }

    let errors: Vec<ItemError> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let errors = field_errors(item, &rule.items, document);
            (!errors.is_empty()).then_some(ItemError { index, errors })
        })
        .collect();

    (!errors.is_empty()).then_some(FieldError::Items(errors))
}

fn evaluate_object_props(
    value: &JsonValue,
    rule: &ObjectPropsRule,
    document: &JsonValue,
) -> Option<FieldError> {
    let map = match value {
        JsonValue::Null => None,
        JsonValue::Object(map) => Some(map),
        _ => return Some(FieldError::message("Must be a map of key/value pairs")),
    };

    let Some(map) = map.filter(|m| !m.is_empty()) else {
        return rule.required.then(|| {
            FieldError::message(rule.required_message.as_deref().unwrap_or(REQUIRED_MESSAGE))
        });
    };

    let errors: Vec<EntryError> = map
        .iter()
        .filter_map(|(key, entry_value)| {
            let key_error = evaluate(&JsonValue::String(key.clone()), &rule.key, document);
            let value_error = evaluate(entry_value, &rule.value, document);
            (key_error.is_some() || value_error.is_some()).then(|| EntryError {
                key: key.clone(),
                value: entry_value.clone(),
                key_error,
                value_error,
            })
        })
        .collect();

    (!errors.is_empty()).then_some(FieldError::Entries(errors))
}

fn evaluate_fields(
    value: &JsonValue,
    fields: &IndexMap<String, ValidatorNode>,
    document: &JsonValue,
) -> Option<FieldError> {
    let errors = field_errors(value, fields, document);
    (!errors.is_empty()).then_some(FieldError::Fields(errors))
}

fn field_errors(
    value: &JsonValue,
    fields: &IndexMap<String, ValidatorNode>,
    document: &JsonValue,
) -> IndexMap<String, FieldError> {
    fields
        .iter()
        .filter_map(|(name, node)| {
            let field_value = value.get(name).unwrap_or(&JsonValue::Null);
            evaluate(field_value, node, document).map(|error| (name.clone(), error))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::node::{ContextualRule, array_of, contextual, fields, leaf, object_props};
    use serde_json::json;

    #[test]
    fn test_required_array() {
        let node: ValidatorNode = array_of([]).required().into();
        assert_eq!(
            evaluate(&json!([]), &node, &json!({})),
            Some(FieldError::message(REQUIRED_LIST_MESSAGE))
        );

        let node: ValidatorNode = array_of([]).required_with("Add a maintainer").into();
        assert_eq!(
            evaluate(&JsonValue::Null, &node, &json!({})),
            Some(FieldError::message("Add a maintainer"))
        );
    }

    #[test]
    fn test_leaf_required_then_regex() {
        let node: ValidatorNode = leaf()
            .required()
            .regex(r"^[a-z]+$", "Lowercase letters only")
            .into();

        assert_eq!(
            evaluate(&json!("  "), &node, &json!({})),
            Some(FieldError::message(REQUIRED_MESSAGE))
        );
        assert_eq!(
            evaluate(&json!("Etcd"), &node, &json!({})),
            Some(FieldError::message("Lowercase letters only"))
        );
        assert_eq!(evaluate(&json!("etcd"), &node, &json!({})), None);
    }

    #[test]
    fn test_optional_leaf_skips_checks_when_empty() {
        let node: ValidatorNode = leaf().regex(r"^https?://", "Must be a URL").into();

        assert_eq!(evaluate(&json!(""), &node, &json!({})), None);
        assert!(evaluate(&json!("ftp://x"), &node, &json!({})).is_some());
    }

    #[test]
    fn test_leaf_callback() {
        fn even(value: &JsonValue) -> Option<String> {
            match value.as_i64() {
                Some(n) if n % 2 == 0 => None,
                _ => Some("Must be even".to_string()),
            }
        }
        let node: ValidatorNode = leaf().check(even).into();

        assert_eq!(evaluate(&json!(4), &node, &json!({})), None);
        assert_eq!(
            evaluate(&json!(3), &node, &json!({})),
            Some(FieldError::message("Must be even"))
        );
    }

    #[test]
    fn test_array_items_collect_only_failing() {
        let node: ValidatorNode = array_of([
            ("name", leaf().required().into()),
            ("email", leaf().regex(r"@", "Invalid email").into()),
        ])
        .into();
        let value = json!([
            {"name": "a", "email": "a@example.com"},
            {"name": "", "email": "nope"},
        ]);

        let Some(FieldError::Items(items)) = evaluate(&value, &node, &json!({})) else {
            panic!("expected item errors");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].index, 1);
        assert_eq!(items[0].errors["name"], FieldError::message(REQUIRED_MESSAGE));
        assert_eq!(items[0].errors["email"], FieldError::message("Invalid email"));
    }

    #[test]
    fn test_object_props() {
        let node: ValidatorNode = object_props(
            leaf().regex(r"^[a-z./-]+$", "Invalid key"),
            leaf().required(),
        )
        .into();
        let value = json!({"app": "etcd", "Bad": "x", "tier": ""});

        let Some(FieldError::Entries(entries)) = evaluate(&value, &node, &json!({})) else {
            panic!("expected entry errors");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "Bad");
        assert!(entries[0].key_error.is_some());
        assert!(entries[0].value_error.is_none());
        assert_eq!(entries[1].key, "tier");
        assert!(entries[1].value_error.is_some());

        assert_eq!(evaluate(&json!({}), &node, &json!({})), None);
    }

    #[test]
    fn test_contextual_sees_document() {
        fn matches_kind(value: &JsonValue, document: &JsonValue, _: &ContextualRule) -> Option<FieldError> {
            (value != &document["kind"]).then(|| FieldError::message("Must match kind"))
        }
        let tree = fields([("spec", fields([("kind", contextual(matches_kind).into())]))]);
        let document = json!({"kind": "Foo", "spec": {"kind": "Bar"}});

        let errors = validate_all(&document, &tree).unwrap();
        assert_eq!(errors.at("spec.kind"), Some(&FieldError::message("Must match kind")));
    }

    #[test]
    fn test_first_error_short_circuits() {
        let tree = fields([
            ("metadata", fields([("name", leaf().required().into())])),
            ("spec", fields([("version", leaf().required().into())])),
        ]);
        let document = json!({"metadata": {}, "spec": {}});

        let (path, error) = first_error(&document, &tree).unwrap();
        assert_eq!(path, "metadata.name");
        assert_eq!(error, FieldError::message(REQUIRED_MESSAGE));

        let all = validate_all(&document, &tree).unwrap();
        assert_eq!(all.count(), 2);
    }

    #[test]
    fn test_valid_document_has_no_errors() {
        let tree = fields([("spec", fields([("version", leaf().required().into())]))]);
        assert_eq!(validate_all(&json!({"spec": {"version": "1.0.0"}}), &tree), None);
        assert_eq!(first_error(&json!({"spec": {"version": "1.0.0"}}), &tree), None);
    }
}
