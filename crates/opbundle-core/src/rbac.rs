//! RBAC uploads to CSV permissions
//!
//! Roles become `permissions` and ClusterRoles `clusterPermissions`. The
//! service account of each entry comes from the bindings that reference
//! the role; a role nobody binds is granted to a service account named
//! after the role itself.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::classify::ObjectType;
use crate::manifest::{Permission, PolicyRule};

/// Permissions derived from a set of RBAC documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedPermissions {
    /// Entries for `spec.install.spec.permissions`
    pub permissions: Vec<JsonValue>,
    /// Entries for `spec.install.spec.clusterPermissions`
    pub cluster_permissions: Vec<JsonValue>,
}

impl DerivedPermissions {
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.cluster_permissions.is_empty()
    }
}

/// Derive permissions from classified RBAC documents
///
/// Documents of other types are ignored, as are ServiceAccounts: they
/// only matter through the bindings naming them.
pub fn derive_permissions(objects: &[(ObjectType, &JsonValue)]) -> DerivedPermissions {
    let bindings: Vec<&JsonValue> = objects
        .iter()
        .filter(|(t, _)| matches!(t, ObjectType::RoleBinding | ObjectType::ClusterRoleBinding))
        .map(|(_, doc)| *doc)
        .collect();

    let mut namespaced: IndexMap<String, Vec<PolicyRule>> = IndexMap::new();
    let mut cluster: IndexMap<String, Vec<PolicyRule>> = IndexMap::new();

    for (object_type, role) in objects {
        let (target, role_kind) = match object_type {
            ObjectType::Role => (&mut namespaced, "Role"),
            ObjectType::ClusterRole => (&mut cluster, "ClusterRole"),
            _ => continue,
        };

        let role_name = role
            .pointer("/metadata/name")
            .and_then(|n| n.as_str())
            .unwrap_or_default();
        let rules = rules_of(role);

        let mut accounts = service_accounts_for(role_kind, role_name, &bindings);
        if accounts.is_empty() {
            accounts.push(role_name.to_string());
        }

        for account in accounts {
            debug!(role = role_name, service_account = %account, "Granting role rules");
            target.entry(account).or_default().extend(rules.iter().cloned());
        }
    }

    DerivedPermissions {
        permissions: into_entries(namespaced),
        cluster_permissions: into_entries(cluster),
    }
}

fn service_accounts_for(role_kind: &str, role_name: &str, bindings: &[&JsonValue]) -> Vec<String> {
    let mut accounts: Vec<String> = Vec::new();
    for binding in bindings {
        let Some(role_ref) = binding.get("roleRef") else {
            continue;
        };
        let kind = role_ref.get("kind").and_then(|k| k.as_str());
        let name = role_ref.get("name").and_then(|n| n.as_str());
        if kind != Some(role_kind) || name != Some(role_name) {
            continue;
        }

        let subjects = binding
            .get("subjects")
            .and_then(|s| s.as_array())
            .map(|s| s.as_slice())
            .unwrap_or(&[]);
        for subject in subjects {
            if subject.get("kind").and_then(|k| k.as_str()) != Some("ServiceAccount") {
                continue;
            }
            if let Some(account) = subject.get("name").and_then(|n| n.as_str()) {
                if !accounts.iter().any(|a| a == account) {
                    accounts.push(account.to_string());
                }
            }
        }
    }
    accounts
}

fn rules_of(role: &JsonValue) -> Vec<PolicyRule> {
    let rules = role
        .get("rules")
        .and_then(|r| r.as_array())
        .map(|r| r.as_slice())
        .unwrap_or(&[]);
    rules
        .iter()
        .filter_map(|rule| match serde_json::from_value(rule.clone()) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(error = %e, "Skipping malformed policy rule");
                None
            }
        })
        .collect()
}

fn into_entries(grants: IndexMap<String, Vec<PolicyRule>>) -> Vec<JsonValue> {
    grants
        .into_iter()
        .map(|(service_account_name, rules)| Permission {
            service_account_name,
            rules,
        })
        .filter_map(|permission| serde_json::to_value(permission).ok())
        .collect()
}
