//! Validation error trees

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Errors found for a field, shaped like the field itself
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldError {
    /// Error on a scalar field, or on a list/map as a whole
    Message(String),
    /// Errors of individual list items
    Items(Vec<ItemError>),
    /// Errors of individual key/value entries
    Entries(Vec<EntryError>),
    /// Errors of nested fields
    Fields(IndexMap<String, FieldError>),
}

/// Errors of one list item, by field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    pub index: usize,
    pub errors: IndexMap<String, FieldError>,
}

/// Errors of one key/value entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryError {
    pub key: String,
    pub value: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_error: Option<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_error: Option<FieldError>,
}

/// A single error message with the dotted path of its field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn message(message: impl Into<String>) -> Self {
        FieldError::Message(message.into())
    }

    /// Navigate to the error of a nested field
    ///
    /// List items are addressed by their index.
    pub fn at(&self, path: &str) -> Option<&FieldError> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        descend(self, &segments)
    }

    /// Every error message with its dotted field path
    pub fn flatten(&self) -> Vec<FlatError> {
        let mut out = Vec::new();
        collect(self, "", &mut out);
        out
    }

    /// Number of error messages in the tree
    pub fn count(&self) -> usize {
        self.flatten().len()
    }
}

fn descend<'a>(error: &'a FieldError, segments: &[&str]) -> Option<&'a FieldError> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(error);
    };
    match error {
        FieldError::Fields(map) => descend(map.get(*first)?, rest),
        FieldError::Items(items) => {
            let index: usize = first.parse().ok()?;
            let item = items.iter().find(|i| i.index == index)?;
            let (field, rest) = rest.split_first()?;
            descend(item.errors.get(*field)?, rest)
        }
        FieldError::Message(_) | FieldError::Entries(_) => None,
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

fn collect(error: &FieldError, prefix: &str, out: &mut Vec<FlatError>) {
    match error {
        FieldError::Message(message) => out.push(FlatError {
            path: prefix.to_string(),
            message: message.clone(),
        }),
        FieldError::Items(items) => {
            for item in items {
                let item_path = join(prefix, &item.index.to_string());
                for (field, error) in &item.errors {
                    collect(error, &join(&item_path, field), out);
                }
            }
        }
        FieldError::Entries(entries) => {
            for entry in entries {
                let entry_path = join(prefix, &entry.key);
                if let Some(error) = &entry.key_error {
                    collect(error, &format!("{} (key)", entry_path), out);
                }
                if let Some(error) = &entry.value_error {
                    collect(error, &entry_path, out);
                }
            }
        }
        FieldError::Fields(map) => {
            for (field, error) in map {
                collect(error, &join(prefix, field), out);
            }
        }
    }
}
