//! ClusterServiceVersion manifest document
//!
//! The manifest is kept as a loosely typed JSON tree so that fields the
//! editor does not know about survive a merge/export cycle untouched.
//! Typed views are provided for the identity-bearing sub-objects.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// API version of every ClusterServiceVersion produced by the editor
pub const CSV_API_VERSION: &str = "operators.coreos.com/v1alpha1";

/// Kind of the manifest document
pub const CSV_KIND: &str = "ClusterServiceVersion";

/// Well-known field paths inside the manifest
pub mod paths {
    pub const NAME: &str = "metadata.name";
    pub const ANNOTATIONS: &str = "metadata.annotations";
    pub const ALM_EXAMPLES: &str = "metadata.annotations.alm-examples";
    pub const DESCRIPTION: &str = "spec.description";
    pub const VERSION: &str = "spec.version";
    pub const OWNED_CRDS: &str = "spec.customresourcedefinitions.owned";
    pub const REQUIRED_CRDS: &str = "spec.customresourcedefinitions.required";
    pub const DEPLOYMENTS: &str = "spec.install.spec.deployments";
    pub const PERMISSIONS: &str = "spec.install.spec.permissions";
    pub const CLUSTER_PERMISSIONS: &str = "spec.install.spec.clusterPermissions";
    pub const INSTALL_MODES: &str = "spec.installModes";
}

/// Operator manifest (ClusterServiceVersion) as a JSON tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(pub JsonValue);

impl Default for Manifest {
    fn default() -> Self {
        crate::placeholder::default_manifest()
    }
}

impl Manifest {
    /// Wrap an already decoded document
    pub fn from_value(value: JsonValue) -> Self {
        Self(value)
    }

    /// Load a manifest from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        if !value.is_object() {
            return Err(CoreError::InvalidDocument {
                message: "manifest must be a mapping".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Encode the manifest as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Get a value by dotted path (e.g., "spec.provider.name")
    ///
    /// A literal dot inside a key is written as `\.`.
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts = split_path(path);
        get_nested(&self.0, &parts)
    }

    /// Get an array by dotted path, empty when missing or not an array
    pub fn get_array(&self, path: &str) -> &[JsonValue] {
        self.get(path)
            .and_then(|v| v.as_array())
            .map(|a| a.as_slice())
            .unwrap_or(&[])
    }

    /// Get a string by dotted path, empty when missing or not a string
    pub fn get_str(&self, path: &str) -> &str {
        self.get(path).and_then(|v| v.as_str()).unwrap_or("")
    }

    /// Set a value by dotted path, creating intermediate objects
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts = split_path(path);
        if parts.is_empty() {
            return Err(CoreError::InvalidEdit {
                message: "empty field path".to_string(),
            });
        }
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Return a copy with `value` stored at `path`
    pub fn with(&self, path: &str, value: JsonValue) -> Result<Self> {
        let mut next = self.clone();
        next.set(path, value)?;
        Ok(next)
    }

    /// Base name (`metadata.name`)
    pub fn name(&self) -> &str {
        self.get_str(paths::NAME)
    }

    /// Operator version (`spec.version`)
    pub fn version(&self) -> &str {
        self.get_str(paths::VERSION)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

/// A single `key=value` field edit
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEdit {
    pub path: String,
    pub value: JsonValue,
}

/// Parse `key=value` edit arguments
///
/// Values are typed: `true`/`false`/`null`, integers, floats and JSON
/// arrays/objects are decoded, everything else stays a string.
pub fn parse_set_values(set_args: &[String]) -> Result<Vec<FieldEdit>> {
    set_args
        .iter()
        .map(|arg| {
            let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::InvalidEdit {
                message: format!("Invalid edit format: '{}'. Expected key=value", arg),
            })?;
            Ok(FieldEdit {
                path: key.trim().to_string(),
                value: parse_scalar(val),
            })
        })
        .collect()
}

fn parse_scalar(val: &str) -> JsonValue {
    if val == "true" {
        JsonValue::Bool(true)
    } else if val == "false" {
        JsonValue::Bool(false)
    } else if val == "null" {
        JsonValue::Null
    } else if let Ok(num) = val.parse::<i64>() {
        JsonValue::Number(num.into())
    } else if let Ok(num) = val.parse::<f64>() {
        serde_json::Number::from_f64(num)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(val.to_string()))
    } else if val.starts_with('[') || val.starts_with('{') {
        serde_json::from_str(val).unwrap_or_else(|_| JsonValue::String(val.to_string()))
    } else {
        JsonValue::String(val.to_string())
    }
}

/// Split a dotted path, honoring `\.` escapes
pub fn split_path(path: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !parts.is_empty() {
        parts.push(current);
    }
    parts
}

fn get_nested<'a>(value: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(key).and_then(|v| get_nested(v, remaining)),
        JsonValue::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

fn set_nested(value: &mut JsonValue, path: &[String], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if let JsonValue::Array(items) = value {
        if let Some(item) = key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            set_nested(item, remaining, new_value);
            return;
        }
    }

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value);
    }
}

// =========================================================================
// Typed views
// =========================================================================

/// UI hint attached to a CRD spec or status field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "x-descriptors", default)]
    pub x_descriptors: Vec<String>,
}

/// Kubernetes resource created by an owned CRD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

/// CRD owned by the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedCrd {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub spec_descriptors: Vec<CrdDescriptor>,
    #[serde(default)]
    pub status_descriptors: Vec<CrdDescriptor>,
}

/// RBAC policy rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_resource_urls: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
}

/// Namespaced or cluster-wide permission of a service account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub service_account_name: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

/// Deployment installed by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub name: String,
    #[serde(default)]
    pub spec: JsonValue,
}

/// Install mode support flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallMode {
    #[serde(rename = "type", default)]
    pub mode_type: String,
    #[serde(default)]
    pub supported: bool,
}
