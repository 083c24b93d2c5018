//! Manifest normalization between the editor and the wire format
//!
//! Imported manifests get a version-free base name, descriptor ids and a
//! split description. Before validation the placeholder entries are
//! removed; before export the synthetic ids go too, the description is
//! joined and the version is appended to the name again.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::description::DescriptionSections;
use crate::examples::{examples_of, with_examples};
use crate::ids::{IdGenerator, assign_descriptor_ids, strip_descriptor_ids};
use crate::manifest::{Manifest, paths};
use crate::placeholder::{PlaceholderKind, remove_placeholders};

/// `.v` token followed by a version, e.g. `etcdoperator.v0.9.2`
static VERSION_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.v(\d.*)$").expect("valid regex"));

/// Bare semantic-version suffix, e.g. `etcdoperator.0.9.2`
static VERSION_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(\d+\.\d+\.\d+.*)$").expect("valid regex"));

/// Manifest as imported into the editor
#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    pub manifest: Manifest,
    pub description: DescriptionSections,
}

/// Split a CSV name into its base name and embedded version
pub fn deversion_name(name: &str) -> (&str, Option<&str>) {
    for re in [&*VERSION_TOKEN_RE, &*VERSION_SUFFIX_RE] {
        if let Some(caps) = re.captures(name) {
            let (Some(whole), Some(version)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            return (&name[..whole.start()], Some(version.as_str()));
        }
    }
    (name, None)
}

/// `<base name>.v<version>`, with one leading `v`/`V` removed from the version
///
/// An empty version leaves the base name alone.
pub fn versioned_name(name: &str, version: &str) -> String {
    let (base, _) = deversion_name(name);
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);
    if version.is_empty() {
        base.to_string()
    } else {
        format!("{}.v{}", base, version)
    }
}

/// Prepare a decoded manifest for editing
pub fn normalize_imported(manifest: &Manifest, ids: &mut dyn IdGenerator) -> Imported {
    let mut next = assign_descriptor_ids(manifest, ids);

    let (base, embedded_version) = deversion_name(manifest.name());
    if let Some(version) = embedded_version {
        debug!(name = manifest.name(), base, version, "Stripped version from manifest name");
        if next.version().is_empty() {
            let _ = next.set(paths::VERSION, JsonValue::String(version.to_string()));
        }
        let _ = next.set(paths::NAME, JsonValue::String(base.to_string()));
    }

    let description = DescriptionSections::split(manifest.get_str(paths::DESCRIPTION));

    Imported {
        manifest: next,
        description,
    }
}

/// Manifest as seen by the validators: without placeholder entries
pub fn normalize_for_validation(manifest: &Manifest) -> Manifest {
    let mut next = manifest.clone();

    for path in [paths::OWNED_CRDS, paths::REQUIRED_CRDS] {
        let crds: Vec<JsonValue> = remove_placeholders(manifest.get_array(path), PlaceholderKind::Crd)
            .iter()
            .map(without_placeholder_descriptors)
            .collect();
        if manifest.get(path).is_some() {
            let _ = next.set(path, JsonValue::Array(crds));
        }
    }

    if manifest.get(paths::DEPLOYMENTS).is_some() {
        let deployments = remove_placeholders(
            manifest.get_array(paths::DEPLOYMENTS),
            PlaceholderKind::Deployment,
        );
        let _ = next.set(paths::DEPLOYMENTS, JsonValue::Array(deployments));
    }

    let examples = examples_of(manifest);
    let real = remove_placeholders(&examples, PlaceholderKind::AlmExample);
    if real.len() != examples.len() {
        next = with_examples(&next, &real);
    }

    next
}

/// Manifest ready to be encoded for export
pub fn normalize_for_export(manifest: &Manifest, description: &DescriptionSections) -> Manifest {
    let mut next = strip_descriptor_ids(&normalize_for_validation(manifest));

    if !description.is_empty() {
        let _ = next.set(paths::DESCRIPTION, JsonValue::String(description.join()));
    }

    let name = versioned_name(manifest.name(), manifest.version());
    let _ = next.set(paths::NAME, JsonValue::String(name));

    next
}

fn without_placeholder_descriptors(crd: &JsonValue) -> JsonValue {
    let mut crd = crd.clone();
    if let JsonValue::Object(map) = &mut crd {
        for field in ["specDescriptors", "statusDescriptors"] {
            if let Some(JsonValue::Array(descriptors)) = map.get(field) {
                let real = remove_placeholders(descriptors, PlaceholderKind::Descriptor);
                map.insert(field.to_string(), JsonValue::Array(real));
            }
        }
    }
    crd
}
