//! Editor sections and their status

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::manifest::paths;
use crate::validation::{FieldError, FlatError};

/// A part of the manifest edited as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    General,
    OwnedCrds,
    RequiredCrds,
    Deployments,
    Permissions,
    ClusterPermissions,
    InstallModes,
    Package,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::General,
        Section::OwnedCrds,
        Section::RequiredCrds,
        Section::Deployments,
        Section::Permissions,
        Section::ClusterPermissions,
        Section::InstallModes,
        Section::Package,
    ];

    /// Manifest paths owned by the section
    ///
    /// `General` owns everything not claimed by another section; the
    /// package lives outside the manifest.
    pub fn paths(self) -> &'static [&'static str] {
        match self {
            Section::General => &["metadata", "spec"],
            Section::OwnedCrds => &[paths::OWNED_CRDS, paths::ALM_EXAMPLES],
            Section::RequiredCrds => &[paths::REQUIRED_CRDS],
            Section::Deployments => &[paths::DEPLOYMENTS],
            Section::Permissions => &[paths::PERMISSIONS],
            Section::ClusterPermissions => &[paths::CLUSTER_PERMISSIONS],
            Section::InstallModes => &[paths::INSTALL_MODES],
            Section::Package => &[],
        }
    }

    /// Section owning a manifest field path
    pub fn for_path(path: &str) -> Section {
        let mut best = (0, Section::General);
        for section in Section::ALL {
            for owned in section.paths() {
                let matches = path == *owned
                    || (path.starts_with(owned) && path[owned.len()..].starts_with('.'));
                if matches && owned.len() > best.0 && section != Section::General {
                    best = (owned.len(), section);
                }
            }
        }
        best.1
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::General => "General",
            Section::OwnedCrds => "Owned CRDs",
            Section::RequiredCrds => "Required CRDs",
            Section::Deployments => "Deployments",
            Section::Permissions => "Permissions",
            Section::ClusterPermissions => "Cluster Permissions",
            Section::InstallModes => "Install Modes",
            Section::Package => "Package",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Status of a section as shown in the editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionStatus {
    #[default]
    Empty,
    Modified,
    AllGood,
    Errors,
}

impl SectionStatus {
    /// Status after the user edited the section
    pub fn modified(self) -> Self {
        SectionStatus::Modified
    }

    /// Status after a validation run
    ///
    /// An untouched section stays empty unless it has errors.
    pub fn after_validation(self, has_errors: bool) -> Self {
        match (self, has_errors) {
            (_, true) => SectionStatus::Errors,
            (SectionStatus::Empty, false) => SectionStatus::Empty,
            (_, false) => SectionStatus::AllGood,
        }
    }
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectionStatus::Empty => "empty",
            SectionStatus::Modified => "modified",
            SectionStatus::AllGood => "all good",
            SectionStatus::Errors => "errors",
        };
        f.write_str(label)
    }
}

/// Status of every section, in display order
pub fn initial_statuses() -> IndexMap<Section, SectionStatus> {
    Section::ALL
        .into_iter()
        .map(|s| (s, SectionStatus::Empty))
        .collect()
}

/// Manifest errors belonging to `section`
pub fn section_errors(errors: &FieldError, section: Section) -> Vec<FlatError> {
    errors
        .flatten()
        .into_iter()
        .filter(|e| Section::for_path(&e.path) == section)
        .collect()
}

/// Manifest errors grouped by section, in display order
pub fn errors_by_section(errors: &FieldError) -> IndexMap<Section, Vec<FlatError>> {
    let mut grouped: IndexMap<Section, Vec<FlatError>> = IndexMap::new();
    for error in errors.flatten() {
        grouped
            .entry(Section::for_path(&error.path))
            .or_default()
            .push(error);
    }
    grouped.sort_keys();
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{csv_validator, validate_all};
    use serde_json::json;

    #[test]
    fn test_for_path() {
        assert_eq!(Section::for_path("metadata.name"), Section::General);
        assert_eq!(Section::for_path("spec.installModes"), Section::InstallModes);
        assert_eq!(
            Section::for_path("spec.customresourcedefinitions.owned.0.kind"),
            Section::OwnedCrds
        );
        assert_eq!(
            Section::for_path("metadata.annotations.alm-examples"),
            Section::OwnedCrds
        );
        assert_eq!(
            Section::for_path("spec.install.spec.permissionsExtra"),
            Section::General
        );
    }

    #[test]
    fn test_status_transitions() {
        let status = SectionStatus::Empty;
        assert_eq!(status.after_validation(false), SectionStatus::Empty);
        assert_eq!(status.after_validation(true), SectionStatus::Errors);

        let status = status.modified();
        assert_eq!(status, SectionStatus::Modified);
        assert_eq!(status.after_validation(false), SectionStatus::AllGood);
        assert_eq!(SectionStatus::Errors.after_validation(false), SectionStatus::AllGood);
        assert_eq!(SectionStatus::AllGood.modified(), SectionStatus::Modified);
    }

    #[test]
    fn test_errors_grouped_by_section() {
        let document = json!({
            "metadata": {"name": ""},
            "spec": {"installModes": [], "install": {"spec": {"deployments": []}}},
        });
        let errors = validate_all(&document, csv_validator()).unwrap();

        let grouped = errors_by_section(&errors);

        assert!(grouped.contains_key(&Section::General));
        assert!(grouped.contains_key(&Section::OwnedCrds));
        assert!(grouped.contains_key(&Section::Deployments));
        assert_eq!(
            section_errors(&errors, Section::InstallModes)
                .iter()
                .map(|e| e.path.as_str())
                .collect::<Vec<_>>(),
            vec!["spec.installModes"]
        );
        assert!(section_errors(&errors, Section::Permissions).is_empty());
    }
}
