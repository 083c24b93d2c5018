//! Classification of uploaded documents
//!
//! Decides what kind of Kubernetes object an uploaded document is and
//! extracts its identity. Rules are checked in order and the first match
//! wins; example CRs are recognized by file name first because they carry
//! a `kind` but no reliable `apiVersion`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// API groups recognized by the classifier
pub mod groups {
    pub const OPERATORS: &str = "operators.coreos.com";
    pub const API_EXTENSIONS: &str = "apiextensions.k8s.io";
    pub const APPS: &str = "apps";
    pub const RBAC: &str = "rbac.authorization.k8s.io";
}

/// Suffix of custom resource example files
pub const CR_EXAMPLE_SUFFIX: &str = "_cr.yaml";

/// Semantic type of an uploaded object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    ClusterServiceVersion,
    CustomResourceDefinition,
    Package,
    Deployment,
    Role,
    ClusterRole,
    RoleBinding,
    ClusterRoleBinding,
    ServiceAccount,
    CustomResourceExampleTemplate,
}

impl ObjectType {
    /// Whether the type feeds the permission lists
    pub fn is_rbac(self) -> bool {
        matches!(
            self,
            ObjectType::Role
                | ObjectType::ClusterRole
                | ObjectType::RoleBinding
                | ObjectType::ClusterRoleBinding
                | ObjectType::ServiceAccount
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::ClusterServiceVersion => "ClusterServiceVersion",
            ObjectType::CustomResourceDefinition => "CustomResourceDefinition",
            ObjectType::Package => "Package",
            ObjectType::Deployment => "Deployment",
            ObjectType::Role => "Role",
            ObjectType::ClusterRole => "ClusterRole",
            ObjectType::RoleBinding => "RoleBinding",
            ObjectType::ClusterRoleBinding => "ClusterRoleBinding",
            ObjectType::ServiceAccount => "ServiceAccount",
            ObjectType::CustomResourceExampleTemplate => "CustomResourceExampleTemplate",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type and identity of a recognized document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub name: String,
}

impl Classification {
    fn new(object_type: ObjectType, name: &str) -> Self {
        Self {
            object_type,
            name: name.to_string(),
        }
    }
}

/// Classify a decoded document
///
/// Returns `None` for documents of an unsupported kind.
pub fn classify(doc: &JsonValue, file_name: &str) -> Option<Classification> {
    let kind = doc.get("kind").and_then(|k| k.as_str());

    if let Some(kind) = kind {
        if file_name.ends_with(CR_EXAMPLE_SUFFIX) {
            return Some(Classification::new(
                ObjectType::CustomResourceExampleTemplate,
                kind,
            ));
        }
    }

    let api_version = doc.get("apiVersion").and_then(|v| v.as_str());
    let name = doc
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str());

    if let (Some(kind), Some(api_version), Some(name)) = (kind, api_version, name) {
        if let Some(object_type) = kubernetes_type(kind, api_version) {
            return Some(Classification::new(object_type, name));
        }
    }

    let package_name = doc.get("packageName").and_then(|p| p.as_str());
    if let (Some(package_name), true) = (package_name, doc.get("channels").is_some()) {
        return Some(Classification::new(ObjectType::Package, package_name));
    }

    None
}

fn kubernetes_type(kind: &str, api_version: &str) -> Option<ObjectType> {
    let api_group = api_version.split('/').next().unwrap_or(api_version);

    let object_type = match (kind, api_group) {
        ("ClusterServiceVersion", groups::OPERATORS) => ObjectType::ClusterServiceVersion,
        ("CustomResourceDefinition", groups::API_EXTENSIONS) => {
            ObjectType::CustomResourceDefinition
        }
        ("Deployment", groups::APPS) => ObjectType::Deployment,
        ("Role", groups::RBAC) => ObjectType::Role,
        ("ClusterRole", groups::RBAC) => ObjectType::ClusterRole,
        ("RoleBinding", groups::RBAC) => ObjectType::RoleBinding,
        ("ClusterRoleBinding", groups::RBAC) => ObjectType::ClusterRoleBinding,
        ("ServiceAccount", _) => ObjectType::ServiceAccount,
        _ => return None,
    };
    Some(object_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_crd() {
        let doc = json!({
            "kind": "CustomResourceDefinition",
            "apiVersion": "apiextensions.k8s.io/v1",
            "metadata": {"name": "foos.example.com"},
        });

        assert_eq!(
            classify(&doc, "foo.crd.yaml"),
            Some(Classification::new(
                ObjectType::CustomResourceDefinition,
                "foos.example.com"
            ))
        );
    }

    #[test]
    fn test_classify_package() {
        let doc = json!({"packageName": "etcd", "channels": [{"name": "alpha"}]});

        assert_eq!(
            classify(&doc, "etcd.package.yaml"),
            Some(Classification::new(ObjectType::Package, "etcd"))
        );
    }

    #[test]
    fn test_classify_unknown_kind() {
        let doc = json!({"kind": "Widget", "apiVersion": "widgets.io/v1", "metadata": {"name": "w"}});
        assert_eq!(classify(&doc, "w.yaml"), None);
    }

    #[test]
    fn test_classify_example_by_file_name() {
        let doc = json!({
            "kind": "EtcdCluster",
            "apiVersion": "etcd.database.coreos.com/v1beta2",
            "metadata": {"name": "example"},
        });

        assert_eq!(
            classify(&doc, "etcd_v1beta2_etcdcluster_cr.yaml"),
            Some(Classification::new(
                ObjectType::CustomResourceExampleTemplate,
                "EtcdCluster"
            ))
        );
        assert_eq!(classify(&doc, "etcdcluster.yaml"), None);
    }

    #[test]
    fn test_classify_group_mismatch() {
        let doc = json!({
            "kind": "Deployment",
            "apiVersion": "extensions/v1beta1",
            "metadata": {"name": "op"},
        });
        assert_eq!(classify(&doc, "operator.yaml"), None);
    }

    #[test]
    fn test_classify_rbac_and_service_account() {
        let role = json!({
            "kind": "ClusterRole",
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "metadata": {"name": "etcd-operator"},
        });
        let account = json!({"kind": "ServiceAccount", "apiVersion": "v1", "metadata": {"name": "etcd"}});

        let role = classify(&role, "role.yaml").unwrap();
        assert_eq!(role.object_type, ObjectType::ClusterRole);
        assert!(role.object_type.is_rbac());

        let account = classify(&account, "sa.yaml").unwrap();
        assert_eq!(account.object_type, ObjectType::ServiceAccount);
        assert_eq!(account.name, "etcd");
    }

    #[test]
    fn test_classify_csv_requires_name() {
        let doc = json!({
            "kind": "ClusterServiceVersion",
            "apiVersion": "operators.coreos.com/v1alpha1",
            "metadata": {},
        });
        assert_eq!(classify(&doc, "etcd.clusterserviceversion.yaml"), None);
    }
}
