//! Uploaded files and their audit records

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use tracing::debug;

use crate::classify::{ObjectType, classify};
use crate::error::Result;

/// Status of a document whose kind is not supported
pub const UNSUPPORTED_STATUS: &str = "Unsupported file";

/// One decoded document of an uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: u64,
    /// Identity of the object, empty when it could not be classified
    pub name: String,
    pub file_name: String,
    pub data: JsonValue,
    #[serde(rename = "type")]
    pub object_type: Option<ObjectType>,
    pub errored: bool,
    pub status: String,
    /// Superseded by a later upload of the same object
    #[serde(default)]
    pub overwritten: bool,
}

impl UploadRecord {
    /// Whether the record still contributes to the manifest
    pub fn is_current(&self) -> bool {
        !self.errored && !self.overwritten && self.object_type.is_some()
    }
}

/// Decode a possibly multi-document YAML file
///
/// Empty documents are skipped.
pub fn decode_documents(text: &str) -> Result<Vec<JsonValue>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = JsonValue::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Turn an uploaded file into records, one per document
///
/// Failures are recorded, never returned: a file that can not be decoded
/// yields a single errored record.
pub fn ingest(file_name: &str, text: &str, next_id: &mut u64) -> Vec<UploadRecord> {
    let mut issue = || {
        *next_id += 1;
        *next_id
    };

    let documents = match decode_documents(text) {
        Ok(documents) => documents,
        Err(e) => {
            debug!(file = file_name, error = %e, "Failed to decode upload");
            return vec![UploadRecord {
                id: issue(),
                name: String::new(),
                file_name: file_name.to_string(),
                data: JsonValue::Null,
                object_type: None,
                errored: true,
                status: format!("Parsing error: {}", e),
                overwritten: false,
            }];
        }
    };

    documents
        .into_iter()
        .map(|data| {
            let id = issue();
            match classify(&data, file_name) {
                Some(classification) => {
                    debug!(
                        file = file_name,
                        object_type = %classification.object_type,
                        name = %classification.name,
                        "Classified upload"
                    );
                    UploadRecord {
                        id,
                        status: format!(
                            "Parsed {} {}",
                            classification.object_type, classification.name
                        ),
                        name: classification.name,
                        file_name: file_name.to_string(),
                        data,
                        object_type: Some(classification.object_type),
                        errored: false,
                        overwritten: false,
                    }
                }
                None => UploadRecord {
                    id,
                    name: String::new(),
                    file_name: file_name.to_string(),
                    data,
                    object_type: None,
                    errored: true,
                    status: UNSUPPORTED_STATUS.to_string(),
                    overwritten: false,
                },
            }
        })
        .collect()
}

/// Flag records superseded by a later upload of the same `(type, name)`
///
/// The most recent upload of an identity is canonical. Errored records
/// never take part.
pub fn mark_replaced_objects(records: &[UploadRecord]) -> Vec<UploadRecord> {
    let mut seen: HashSet<(ObjectType, &str)> = HashSet::new();
    let mut marked: Vec<UploadRecord> = Vec::with_capacity(records.len());

    for original in records.iter().rev() {
        let overwritten = match original.object_type {
            Some(object_type) if !original.errored => {
                !seen.insert((object_type, original.name.as_str()))
            }
            _ => false,
        };
        marked.push(UploadRecord {
            overwritten,
            ..original.clone()
        });
    }

    marked.reverse();
    marked
}
