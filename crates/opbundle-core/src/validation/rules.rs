//! Check callbacks and contextual rules used by the validator trees

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

use super::engine::is_empty_value;
use super::error::FieldError;
use super::node::ContextualRule;
use crate::examples::decode_examples;
use crate::manifest::InstallMode;
use crate::placeholder::PlaceholderKind;

/// DNS-1123 subdomain
pub const DNS_SUBDOMAIN: &str =
    r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";

/// Label or annotation key with optional DNS prefix
pub const LABEL_KEY: &str = r"^([a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*/)?[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$";

/// Label value
pub const LABEL_VALUE: &str = r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$";

/// CRD name: `<plural>.<group>`
pub const CRD_NAME: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)+$";

/// Kubernetes kind
pub const KIND: &str = r"^[A-Z][A-Za-z0-9]*$";

/// API version of a CRD (`v1`, `v1alpha1`, `v2beta3`)
pub const API_VERSION: &str = r"^v[1-9][0-9]*((alpha|beta)[1-9][0-9]*)?$";

pub const EMAIL: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

pub const URL: &str = r"^https?://[^\s]+$";

pub const MEDIA_TYPE: &str = r"^image/(png|jpeg|gif|svg\+xml)$";

/// Prefix of every descriptor URN
pub const DESCRIPTOR_URN_PREFIX: &str = "urn:alm:descriptor:";

pub const MATURITY_LEVELS: [&str; 8] = [
    "planning",
    "pre-alpha",
    "alpha",
    "beta",
    "stable",
    "mature",
    "inactive",
    "deprecated",
];

pub const CAPABILITY_LEVELS: [&str; 5] = [
    "Basic Install",
    "Seamless Upgrades",
    "Full Lifecycle",
    "Deep Insights",
    "Auto Pilot",
];

pub const INSTALL_MODE_TYPES: [&str; 4] =
    ["OwnNamespace", "SingleNamespace", "MultiNamespace", "AllNamespaces"];

static DNS_SUBDOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DNS_SUBDOMAIN).expect("valid regex"));

static CRD_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(CRD_NAME).expect("valid regex"));

/// `<plural>.<group>` name of a CustomResourceDefinition
pub fn is_crd_name(name: &str) -> bool {
    CRD_NAME_RE.is_match(name)
}

// =========================================================================
// Plain checks
// =========================================================================

/// Semantic version without a leading `v`
pub fn semantic_version(value: &JsonValue) -> Option<String> {
    let text = value.as_str().unwrap_or_default();
    match semver::Version::parse(text) {
        Ok(_) => None,
        Err(_) => Some("Must be a semantic version, e.g. 0.9.2".to_string()),
    }
}

/// Kubernetes version; a leading `v` is accepted
pub fn kube_version(value: &JsonValue) -> Option<String> {
    let text = value.as_str().unwrap_or_default();
    let text = text.strip_prefix('v').unwrap_or(text);
    match semver::Version::parse(text) {
        Ok(_) => None,
        Err(_) => Some("Must be a Kubernetes version, e.g. 1.11.0".to_string()),
    }
}

pub fn maturity(value: &JsonValue) -> Option<String> {
    one_of(value, &MATURITY_LEVELS)
}

pub fn capability_level(value: &JsonValue) -> Option<String> {
    one_of(value, &CAPABILITY_LEVELS)
}

fn one_of(value: &JsonValue, allowed: &[&str]) -> Option<String> {
    let text = value.as_str().unwrap_or_default();
    if allowed.contains(&text) {
        None
    } else {
        Some(format!("Must be one of: {}", allowed.join(", ")))
    }
}

/// Creation timestamp: a date or an RFC 3339 timestamp
pub fn created_at(value: &JsonValue) -> Option<String> {
    let text = value.as_str().unwrap_or_default().trim();
    let valid = NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDate::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ").is_ok();
    (!valid).then(|| "Must be a date, e.g. 2019-03-28 or 2019-03-28T12:00:00Z".to_string())
}

/// List of non-empty strings
pub fn keywords(value: &JsonValue) -> Option<String> {
    let Some(items) = value.as_array() else {
        return Some("Must be a list of keywords".to_string());
    };
    items
        .iter()
        .any(|k| k.as_str().is_none_or(|s| s.trim().is_empty()))
        .then(|| "Keywords must be non-empty strings".to_string())
}

/// Descriptor URNs
pub fn x_descriptors(value: &JsonValue) -> Option<String> {
    let Some(items) = value.as_array() else {
        return Some("Must be a list of descriptor URNs".to_string());
    };
    let invalid: Vec<&str> = items
        .iter()
        .filter_map(|d| match d.as_str() {
            Some(s) if s.starts_with(DESCRIPTOR_URN_PREFIX) => None,
            Some(s) => Some(s),
            None => Some("<non-string>"),
        })
        .collect();
    (!invalid.is_empty()).then(|| {
        format!(
            "Descriptors must start with '{}': {}",
            DESCRIPTOR_URN_PREFIX,
            invalid.join(", ")
        )
    })
}

/// Deployment spec: a non-empty object
pub fn deployment_spec(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Object(map) if !map.is_empty() => None,
        _ => Some("Deployment spec must be a non-empty object".to_string()),
    }
}

/// Policy rules: a non-empty list where every rule lists verbs
pub fn policy_rules(value: &JsonValue) -> Option<String> {
    let Some(rules) = value.as_array() else {
        return Some("Rules must be a list".to_string());
    };
    if rules.is_empty() {
        return Some("At least one rule is required".to_string());
    }
    let missing_verbs = rules
        .iter()
        .position(|rule| rule.get("verbs").is_none_or(is_empty_value));
    missing_verbs.map(|i| format!("Rule {} has no verbs", i + 1))
}

// =========================================================================
// Contextual rules
// =========================================================================

/// `alm-examples`: a JSON array with one example per owned CRD kind
pub fn alm_examples(
    value: &JsonValue,
    document: &JsonValue,
    _rule: &ContextualRule,
) -> Option<FieldError> {
    let examples = match value {
        JsonValue::Null => Vec::new(),
        JsonValue::String(annotation) => match decode_examples(annotation) {
            Ok(examples) => examples,
            Err(e) => return Some(FieldError::message(format!("Invalid examples: {}", e))),
        },
        _ => return Some(FieldError::message("Examples must be a JSON string")),
    };

    let examples: Vec<&JsonValue> = examples
        .iter()
        .filter(|e| !PlaceholderKind::AlmExample.matches(e))
        .collect();

    if let Some(i) = examples
        .iter()
        .position(|e| e.get("kind").is_none_or(is_empty_value) || e.get("apiVersion").is_none_or(is_empty_value))
    {
        return Some(FieldError::message(format!(
            "Example {} must define apiVersion and kind",
            i + 1
        )));
    }

    let example_kinds: BTreeSet<&str> = examples
        .iter()
        .filter_map(|e| e.get("kind").and_then(|k| k.as_str()))
        .collect();

    let missing: Vec<&str> = owned_crds(document)
        .filter_map(|crd| crd.get("kind").and_then(|k| k.as_str()))
        .filter(|kind| !kind.is_empty() && !example_kinds.contains(kind))
        .collect();

    (!missing.is_empty()).then(|| {
        FieldError::message(format!("Missing example for owned CRD: {}", missing.join(", ")))
    })
}

/// `installModes`: known types and at least one supported mode
pub fn install_modes(
    value: &JsonValue,
    _document: &JsonValue,
    rule: &ContextualRule,
) -> Option<FieldError> {
    let modes: Vec<InstallMode> = match value {
        JsonValue::Array(modes) if !modes.is_empty() => {
            match serde_json::from_value(value.clone()) {
                Ok(modes) => modes,
                Err(e) => return Some(FieldError::message(format!("Invalid install mode: {}", e))),
            }
        }
        JsonValue::Array(_) | JsonValue::Null => {
            return rule
                .required
                .then(|| FieldError::message(rule.required_message()));
        }
        _ => return Some(FieldError::message("Install modes must be a list")),
    };

    let unknown: Vec<&str> = modes
        .iter()
        .map(|m| m.mode_type.as_str())
        .filter(|t| !INSTALL_MODE_TYPES.contains(t))
        .collect();
    if !unknown.is_empty() {
        return Some(FieldError::message(format!(
            "Unknown install mode: {}",
            unknown.join(", ")
        )));
    }

    let any_supported = modes.iter().any(|m| m.supported);
    (!any_supported).then(|| FieldError::message("At least one install mode must be supported"))
}

/// `spec.replaces`: optional CSV name that is not the current one
pub fn replaces(value: &JsonValue, document: &JsonValue, _rule: &ContextualRule) -> Option<FieldError> {
    if is_empty_value(value) {
        return None;
    }
    let Some(text) = value.as_str() else {
        return Some(FieldError::message("Must be the name of a previous version"));
    };
    if !DNS_SUBDOMAIN_RE.is_match(text) {
        return Some(FieldError::message(
            "Must be a valid name, e.g. etcdoperator.v0.9.0",
        ));
    }

    let name = document
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let version = document
        .pointer("/spec/version")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let current = crate::normalize::versioned_name(name, version);

    (text == current).then(|| FieldError::message("An operator version can not replace itself"))
}

/// Package `defaultChannel`: must name a declared channel
pub fn default_channel(
    value: &JsonValue,
    document: &JsonValue,
    _rule: &ContextualRule,
) -> Option<FieldError> {
    let channels: Vec<&str> = document
        .get("channels")
        .and_then(|c| c.as_array())
        .map(|c| c.iter().filter_map(|ch| ch.get("name")?.as_str()).collect())
        .unwrap_or_default();

    match value.as_str().map(str::trim) {
        None | Some("") if channels.len() > 1 => Some(FieldError::message(
            "A default channel is required when several channels exist",
        )),
        None | Some("") => None,
        Some(name) if channels.contains(&name) => None,
        Some(name) => Some(FieldError::message(format!(
            "Default channel '{}' is not one of the package channels",
            name
        ))),
    }
}

fn owned_crds(document: &JsonValue) -> impl Iterator<Item = &JsonValue> {
    document
        .pointer("/spec/customresourcedefinitions/owned")
        .and_then(|o| o.as_array())
        .map(|o| o.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter(|crd| !PlaceholderKind::Crd.matches(crd))
}
