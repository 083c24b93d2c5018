//! Default manifest and placeholder entries
//!
//! Placeholders seed list sections so an empty editor has something to
//! render. A placeholder is dropped as soon as a real entry exists next to
//! it, and is never validated or exported.

use serde_json::{Value as JsonValue, json};

use crate::ids::strip_id;
use crate::manifest::{CSV_API_VERSION, CSV_KIND, Manifest};

/// Empty owned CRD scaffold
pub fn crd() -> JsonValue {
    json!({
        "name": "",
        "displayName": "",
        "kind": "",
        "version": "",
        "description": "",
        "resources": [],
        "specDescriptors": [],
        "statusDescriptors": [],
    })
}

/// Empty deployment scaffold
pub fn deployment() -> JsonValue {
    json!({
        "name": "",
        "spec": {},
    })
}

/// Empty CRD descriptor scaffold
pub fn descriptor() -> JsonValue {
    json!({
        "path": "",
        "displayName": "",
        "description": "",
        "x-descriptors": [],
    })
}

/// Empty ALM example scaffold
pub fn alm_example() -> JsonValue {
    json!({
        "apiVersion": "",
        "kind": "",
        "metadata": {"name": ""},
        "spec": {},
    })
}

/// Manifest every editing session starts from
pub fn default_manifest() -> Manifest {
    Manifest::from_value(json!({
        "apiVersion": CSV_API_VERSION,
        "kind": CSV_KIND,
        "metadata": {
            "name": "",
            "namespace": "placeholder",
            "annotations": {
                "alm-examples": "[]",
                "capabilities": "Basic Install",
                "categories": "",
                "certified": "false",
                "containerImage": "",
                "createdAt": "",
                "description": "",
                "repository": "",
                "support": "",
            },
        },
        "spec": {
            "displayName": "",
            "description": "",
            "maturity": "alpha",
            "version": "",
            "replaces": "",
            "minKubeVersion": "",
            "keywords": [],
            "maintainers": [],
            "provider": {"name": ""},
            "links": [],
            "icon": [],
            "labels": {},
            "selector": {"matchLabels": {}},
            "customresourcedefinitions": {
                "owned": [crd()],
                "required": [],
            },
            "install": {
                "strategy": "deployment",
                "spec": {
                    "permissions": [],
                    "clusterPermissions": [],
                    "deployments": [deployment()],
                },
            },
            "installModes": [
                {"type": "OwnNamespace", "supported": true},
                {"type": "SingleNamespace", "supported": true},
                {"type": "MultiNamespace", "supported": false},
                {"type": "AllNamespaces", "supported": true},
            ],
        },
    }))
}

/// Which scaffold an array holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Crd,
    Deployment,
    Descriptor,
    AlmExample,
}

impl PlaceholderKind {
    /// Canonical scaffold value
    pub fn value(self) -> JsonValue {
        match self {
            PlaceholderKind::Crd => crd(),
            PlaceholderKind::Deployment => deployment(),
            PlaceholderKind::Descriptor => descriptor(),
            PlaceholderKind::AlmExample => alm_example(),
        }
    }

    /// Structural equality with the scaffold, ignoring synthetic ids
    pub fn matches(self, value: &JsonValue) -> bool {
        strip_id(value) == self.value()
    }
}

/// Drop the placeholder when real entries exist next to it
///
/// A sole placeholder is kept so the list never becomes empty.
pub fn strip_placeholder(items: &[JsonValue], kind: PlaceholderKind) -> Vec<JsonValue> {
    if items.len() <= 1 {
        return items.to_vec();
    }
    items.iter().filter(|v| !kind.matches(v)).cloned().collect()
}

/// Remove every placeholder, possibly leaving the list empty
pub fn remove_placeholders(items: &[JsonValue], kind: PlaceholderKind) -> Vec<JsonValue> {
    items.iter().filter(|v| !kind.matches(v)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real_crd() -> JsonValue {
        json!({"name": "foos.example.com", "kind": "Foo", "version": "v1"})
    }

    #[test]
    fn test_strip_placeholder_with_real_entry() {
        let items = vec![crd(), real_crd()];
        assert_eq!(strip_placeholder(&items, PlaceholderKind::Crd), vec![real_crd()]);
    }

    #[test]
    fn test_strip_placeholder_keeps_sole_entry() {
        let items = vec![crd()];
        assert_eq!(strip_placeholder(&items, PlaceholderKind::Crd), vec![crd()]);
    }

    #[test]
    fn test_remove_placeholders_can_empty() {
        let items = vec![crd()];
        assert!(remove_placeholders(&items, PlaceholderKind::Crd).is_empty());
    }

    #[test]
    fn test_placeholder_match_ignores_id() {
        let mut descriptor = descriptor();
        descriptor["id"] = json!("17-1700000000000");
        assert!(PlaceholderKind::Descriptor.matches(&descriptor));

        descriptor["path"] = json!("size");
        assert!(!PlaceholderKind::Descriptor.matches(&descriptor));
    }

    #[test]
    fn test_default_manifest_shape() {
        let manifest = default_manifest();
        assert_eq!(manifest.get_str("kind"), "ClusterServiceVersion");
        assert_eq!(manifest.get_array("spec.customresourcedefinitions.owned"), &[crd()]);
        assert_eq!(manifest.get_array("spec.install.spec.deployments"), &[deployment()]);
        assert_eq!(manifest.get_array("spec.installModes").len(), 4);
    }
}
