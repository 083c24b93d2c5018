//! Editing session
//!
//! A session holds everything the editor works on: the manifest, the
//! package, the description sections, the upload history and the status
//! of every section. It is autosaved as pretty JSON between commands.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::path::{Component, Path};
use tracing::{debug, info, warn};

use crate::classify::ObjectType;
use crate::description::{DescriptionSection, DescriptionSections};
use crate::error::{CoreError, Result};
use crate::examples::merge_example;
use crate::ids::{ClockIds, assign_crd_descriptor_ids};
use crate::manifest::{Deployment, Manifest, paths};
use crate::merge::{
    crd_from_definition, merge_deployment, merge_manifests, merge_owned_crd, merge_permission_list,
};
use crate::normalize::{normalize_for_export, normalize_for_validation, normalize_imported};
use crate::package::OperatorPackage;
use crate::placeholder::default_manifest;
use crate::rbac::derive_permissions;
use crate::status::{Section, SectionStatus, initial_statuses, section_errors};
use crate::upload::{UploadRecord, ingest, mark_replaced_objects};
use crate::validation::rules::is_crd_name;
use crate::validation::{
    FieldError, FlatError, csv_validator, is_empty_value, package_validator, validate_all,
};

/// Prefix addressing package fields in [`EditorSession::set_field`]
pub const PACKAGE_PREFIX: &str = "package.";

/// Optional fields reported as warnings when left empty
pub const RECOMMENDED_FIELDS: [&str; 4] = [
    "metadata.annotations.categories",
    "spec.minKubeVersion",
    "spec.links",
    "spec.icon",
];

/// Warning for an empty recommended field
pub const RECOMMENDED_MESSAGE: &str = "Recommended field is empty";

/// Persisted editor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSession {
    pub manifest: Manifest,
    pub package: OperatorPackage,
    pub description: DescriptionSections,
    pub uploads: Vec<UploadRecord>,
    pub sections: IndexMap<Section, SectionStatus>,
    /// Last descriptor id counter issued
    pub id_counter: u64,
    /// Last upload record id issued
    pub next_upload_id: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of validating a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub manifest_errors: Option<FieldError>,
    pub package_errors: Option<FieldError>,
    /// Empty recommended fields; fatal only in strict mode
    pub warnings: Vec<FlatError>,
    pub sections: IndexMap<Section, SectionStatus>,
}

impl SessionReport {
    pub fn is_valid(&self) -> bool {
        self.manifest_errors.is_none() && self.package_errors.is_none()
    }

    /// Number of error messages across manifest and package
    pub fn error_count(&self) -> usize {
        self.manifest_errors.as_ref().map_or(0, FieldError::count)
            + self.package_errors.as_ref().map_or(0, FieldError::count)
    }
}

/// A file of an exported bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content: String,
}

/// Files making up an operator bundle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportBundle {
    pub files: Vec<ExportFile>,
}

impl ExportBundle {
    /// Write every file into `dir`, creating it when missing
    ///
    /// File names must be plain names; nothing is written when one of them
    /// would land outside `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        if let Some(file) = self.files.iter().find(|f| !is_plain_file_name(&f.file_name)) {
            return Err(CoreError::InvalidDocument {
                message: format!("refusing to write '{}' outside the output directory", file.file_name),
            });
        }
        std::fs::create_dir_all(dir)?;
        for file in &self.files {
            std::fs::write(dir.join(&file.file_name), &file.content)?;
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl EditorSession {
    /// Fresh session over the default manifest
    pub fn new() -> Self {
        let manifest = default_manifest();
        let description = DescriptionSections::split(manifest.get_str(paths::DESCRIPTION));
        Self {
            manifest,
            package: OperatorPackage::default(),
            description,
            uploads: Vec::new(),
            sections: initial_statuses(),
            id_counter: 0,
            next_upload_id: 0,
        }
    }

    /// Load a saved session
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::SessionNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the session, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // =====================================================================
    // Uploads
    // =====================================================================

    /// Ingest an uploaded file and fold its documents into the session
    ///
    /// Returns the records created for the file.
    pub fn upload(&mut self, file_name: &str, text: &str) -> Vec<UploadRecord> {
        let created = ingest(file_name, text, &mut self.next_upload_id);
        let created_ids: Vec<u64> = created.iter().map(|r| r.id).collect();

        self.uploads.extend(created.iter().cloned());
        self.uploads = mark_replaced_objects(&self.uploads);

        let mut touches_rbac = false;
        for record in created.iter().filter(|r| !r.errored) {
            match record.object_type {
                Some(object_type) if object_type.is_rbac() => touches_rbac = true,
                Some(object_type) => self.apply_upload(object_type, &record.data),
                None => {}
            }
        }
        if touches_rbac {
            self.apply_rbac();
        }

        self.uploads
            .iter()
            .filter(|r| created_ids.contains(&r.id))
            .cloned()
            .collect()
    }

    fn apply_upload(&mut self, object_type: ObjectType, data: &JsonValue) {
        let mut ids = ClockIds::starting_at(self.id_counter);

        match object_type {
            ObjectType::ClusterServiceVersion => {
                let uploaded = normalize_imported(&Manifest::from_value(data.clone()), &mut ids);
                for section in touched_sections(&uploaded.manifest) {
                    self.mark_modified(section);
                }
                self.manifest = merge_manifests(&self.manifest, &uploaded.manifest);
                if !uploaded.description.is_empty() {
                    self.description = uploaded.description;
                }
            }
            ObjectType::CustomResourceDefinition => {
                let crd = assign_crd_descriptor_ids(&crd_from_definition(data), &mut ids);
                self.manifest = merge_owned_crd(&self.manifest, crd);
                self.mark_modified(Section::OwnedCrds);
            }
            ObjectType::Package => match self.package.merge(data) {
                Ok(package) => {
                    self.package = package;
                    self.mark_modified(Section::Package);
                }
                Err(e) => debug!(error = %e, "Ignoring malformed package upload"),
            },
            ObjectType::Deployment => {
                let deployment = Deployment {
                    name: data
                        .pointer("/metadata/name")
                        .and_then(|n| n.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    spec: data.get("spec").cloned().unwrap_or_else(|| json!({})),
                };
                match serde_json::to_value(deployment) {
                    Ok(deployment) => {
                        self.manifest = merge_deployment(&self.manifest, deployment);
                    }
                    Err(e) => warn!(error = %e, "Failed to convert deployment"),
                }
                self.mark_modified(Section::Deployments);
            }
            ObjectType::CustomResourceExampleTemplate => {
                self.manifest = merge_example(&self.manifest, data.clone());
                self.mark_modified(Section::OwnedCrds);
            }
            ObjectType::Role
            | ObjectType::ClusterRole
            | ObjectType::RoleBinding
            | ObjectType::ClusterRoleBinding
            | ObjectType::ServiceAccount => self.apply_rbac(),
        }

        self.id_counter = ids.counter;
    }

    /// Recompute permissions from every current RBAC upload
    fn apply_rbac(&mut self) {
        let objects: Vec<(ObjectType, &JsonValue)> = self
            .uploads
            .iter()
            .filter(|r| r.is_current())
            .filter_map(|r| Some((r.object_type?, &r.data)))
            .filter(|(t, _)| t.is_rbac())
            .collect();
        let derived = derive_permissions(&objects);

        if !derived.permissions.is_empty() {
            self.manifest = merge_permission_list(
                &self.manifest,
                paths::PERMISSIONS,
                JsonValue::Array(derived.permissions),
            );
            self.mark_modified(Section::Permissions);
        }
        if !derived.cluster_permissions.is_empty() {
            self.manifest = merge_permission_list(
                &self.manifest,
                paths::CLUSTER_PERMISSIONS,
                JsonValue::Array(derived.cluster_permissions),
            );
            self.mark_modified(Section::ClusterPermissions);
        }
    }

    // =====================================================================
    // Edits
    // =====================================================================

    /// Set a manifest field by dotted path
    ///
    /// Paths starting with `package.` edit the package instead.
    pub fn set_field(&mut self, path: &str, value: JsonValue) -> Result<()> {
        if let Some(package_path) = path.strip_prefix(PACKAGE_PREFIX) {
            let mut package = Manifest::from_value(self.package.to_value()?);
            package.set(package_path, value)?;
            self.package = OperatorPackage::from_value(package.inner())?;
            self.mark_modified(Section::Package);
            return Ok(());
        }

        if path == paths::DESCRIPTION {
            let text = value.as_str().unwrap_or_default();
            self.description = DescriptionSections::split(text);
        }
        self.manifest.set(path, value)?;
        self.mark_modified(Section::for_path(path));
        Ok(())
    }

    /// Replace one section of the long description
    pub fn set_description_section(&mut self, section: DescriptionSection, text: &str) {
        self.description.set(section, text);
        let joined = self.description.join();
        // Non-empty path
        let _ = self.manifest.set(paths::DESCRIPTION, JsonValue::String(joined));
        self.mark_modified(Section::General);
    }

    fn mark_modified(&mut self, section: Section) {
        let status = self.sections.entry(section).or_default();
        *status = status.modified();
    }

    // =====================================================================
    // Validation and export
    // =====================================================================

    /// Validate manifest and package, updating section statuses
    pub fn validate(&mut self) -> SessionReport {
        let view = normalize_for_validation(&self.manifest);
        let manifest_errors = validate_all(view.inner(), csv_validator());
        let warnings: Vec<FlatError> = RECOMMENDED_FIELDS
            .iter()
            .filter(|path| view.get(path).is_none_or(is_empty_value))
            .map(|path| FlatError {
                path: path.to_string(),
                message: RECOMMENDED_MESSAGE.to_string(),
            })
            .collect();
        let package_errors = match self.package.to_value() {
            Ok(package) => validate_all(&package, package_validator()),
            Err(e) => Some(FieldError::message(e.to_string())),
        };

        for section in Section::ALL {
            let has_errors = match section {
                Section::Package => package_errors.is_some(),
                _ => manifest_errors
                    .as_ref()
                    .is_some_and(|errors| !section_errors(errors, section).is_empty()),
            };
            let status = self.sections.entry(section).or_default();
            *status = status.after_validation(has_errors);
        }

        info!(
            manifest_errors = manifest_errors.as_ref().map_or(0, FieldError::count),
            package_errors = package_errors.as_ref().map_or(0, FieldError::count),
            "Validated session"
        );

        SessionReport {
            manifest_errors,
            package_errors,
            warnings,
            sections: self.sections.clone(),
        }
    }

    /// Build the bundle files
    ///
    /// `fallback_channel` is used when the package has no default channel.
    pub fn export(&self, fallback_channel: &str) -> Result<ExportBundle> {
        let csv = normalize_for_export(&self.manifest, &self.description);
        let csv_name = csv.name().to_string();

        let mut package = self.package.with_current_csv(&csv_name, fallback_channel);
        if package.package_name.trim().is_empty() {
            package.package_name = self.manifest.name().to_string();
        }

        let mut files = vec![
            ExportFile {
                file_name: format!("{}.clusterserviceversion.yaml", csv_name),
                content: csv.to_yaml()?,
            },
            ExportFile {
                file_name: package.file_name(),
                content: package.to_yaml()?,
            },
        ];

        for record in self
            .uploads
            .iter()
            .filter(|r| r.is_current() && r.object_type == Some(ObjectType::CustomResourceDefinition))
        {
            if !is_crd_name(&record.name) {
                return Err(CoreError::InvalidDocument {
                    message: format!(
                        "CustomResourceDefinition '{}' from {} is not named <plural>.<group>",
                        record.name, record.file_name
                    ),
                });
            }
            files.push(ExportFile {
                file_name: format!("{}.crd.yaml", record.name),
                content: serde_yaml::to_string(&record.data)?,
            });
        }

        Ok(ExportBundle { files })
    }
}

fn touched_sections(uploaded: &Manifest) -> Vec<Section> {
    let mut touched = vec![Section::General];
    touched.extend(
        Section::ALL
            .into_iter()
            .filter(|s| !matches!(s, Section::General | Section::Package))
            .filter(|s| s.paths().iter().any(|p| uploaded.get(p).is_some())),
    );
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::examples::examples_of;
    use tempfile::TempDir;

    const CSV: &str = r#"
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: etcdoperator.v0.9.2
  annotations:
    capabilities: Full Lifecycle
spec:
  displayName: etcd
  description: |
    Etcd is a distributed key value store.

    ## About this Operator
    Manages etcd clusters.
  version: 0.9.2
  customresourcedefinitions:
    owned:
      - name: etcdclusters.etcd.database.coreos.com
        kind: EtcdCluster
        version: v1beta2
        displayName: etcd Cluster
        specDescriptors:
          - path: size
            displayName: Size
"#;

    const CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: etcdbackups.etcd.database.coreos.com
spec:
  names:
    kind: EtcdBackup
  versions:
    - name: v1beta2
      served: true
      storage: true
"#;

    const RBAC: &str = r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: Role
metadata:
  name: etcd-operator
rules:
  - apiGroups: [""]
    resources: [pods]
    verbs: ["*"]
---
apiVersion: rbac.authorization.k8s.io/v1
kind: RoleBinding
metadata:
  name: etcd-operator
roleRef:
  kind: Role
  name: etcd-operator
subjects:
  - kind: ServiceAccount
    name: etcd-sa
"#;

    #[test]
    fn test_upload_csv_merges_and_splits_description() {
        let mut session = EditorSession::new();

        let records = session.upload("etcd.csv.yaml", CSV);

        assert_eq!(records.len(), 1);
        assert_eq!(session.manifest.name(), "etcdoperator");
        assert_eq!(session.manifest.version(), "0.9.2");
        let owned = session.manifest.get_array(paths::OWNED_CRDS);
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0]["kind"], "EtcdCluster");
        assert!(owned[0]["specDescriptors"][0]["id"].is_string());
        assert!(session.description.about_operator.contains("Manages etcd clusters."));
        assert_eq!(session.sections[&Section::General], SectionStatus::Modified);
        assert_eq!(session.sections[&Section::OwnedCrds], SectionStatus::Modified);
        assert_eq!(session.sections[&Section::Deployments], SectionStatus::Empty);
        assert!(session.id_counter >= 1);
    }

    #[test]
    fn test_upload_crd_and_example() {
        let mut session = EditorSession::new();
        session.upload("etcd.csv.yaml", CSV);

        session.upload("backup.crd.yaml", CRD);
        session.upload(
            "etcdbackup_cr.yaml",
            "kind: EtcdBackup\napiVersion: etcd.database.coreos.com/v1beta2\nspec: {}\n",
        );

        let kinds: Vec<&str> = session
            .manifest
            .get_array(paths::OWNED_CRDS)
            .iter()
            .filter_map(|c| c["kind"].as_str())
            .collect();
        assert_eq!(kinds, vec!["EtcdCluster", "EtcdBackup"]);

        let examples = examples_of(&session.manifest);
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0]["kind"], "EtcdBackup");
    }

    #[test]
    fn test_upload_rbac_derives_permissions() {
        let mut session = EditorSession::new();

        let records = session.upload("rbac.yaml", RBAC);

        assert_eq!(records.len(), 2);
        let permissions = session.manifest.get_array(paths::PERMISSIONS);
        assert_eq!(permissions.len(), 1);
        assert_eq!(permissions[0]["serviceAccountName"], "etcd-sa");
        assert_eq!(session.sections[&Section::Permissions], SectionStatus::Modified);
    }

    #[test]
    fn test_reupload_marks_previous_overwritten() {
        let mut session = EditorSession::new();

        session.upload("backup.crd.yaml", CRD);
        session.upload("backup.crd.yaml", CRD);

        let flags: Vec<bool> = session.uploads.iter().map(|r| r.overwritten).collect();
        assert_eq!(flags, vec![true, false]);
        assert_eq!(session.manifest.get_array(paths::OWNED_CRDS).len(), 1);
    }

    #[test]
    fn test_unsupported_upload_is_recorded() {
        let mut session = EditorSession::new();
        let before = session.manifest.clone();

        let records = session.upload("w.yaml", "apiVersion: widgets.io/v1\nkind: Widget\nmetadata:\n  name: w\n");

        assert!(records[0].errored);
        assert_eq!(session.manifest, before);
        assert_eq!(session.uploads.len(), 1);
    }

    #[test]
    fn test_set_field_marks_section() {
        let mut session = EditorSession::new();

        session.set_field("spec.installModes.0.supported", json!(false)).unwrap();
        session.set_field("package.packageName", json!("etcd")).unwrap();

        assert_eq!(session.sections[&Section::InstallModes], SectionStatus::Modified);
        assert_eq!(session.sections[&Section::Package], SectionStatus::Modified);
        assert_eq!(session.package.package_name, "etcd");
    }

    #[test]
    fn test_description_section_edit() {
        let mut session = EditorSession::new();

        session.set_description_section(DescriptionSection::AboutApplication, "Intro");
        session.set_description_section(
            DescriptionSection::Prerequisites,
            "## Prerequisites for enabling this Operator\nA cluster.",
        );

        assert_eq!(
            session.manifest.get_str(paths::DESCRIPTION),
            "Intro\n## Prerequisites for enabling this Operator\nA cluster."
        );
    }

    #[test]
    fn test_validate_default_session() {
        let mut session = EditorSession::new();

        let report = session.validate();

        assert!(!report.is_valid());
        assert!(report.error_count() > 0);
        assert_eq!(report.sections[&Section::Deployments], SectionStatus::Errors);
        assert_eq!(report.sections[&Section::Permissions], SectionStatus::Empty);
        assert_eq!(report.sections[&Section::Package], SectionStatus::Errors);
        assert_eq!(report.warnings.len(), RECOMMENDED_FIELDS.len());
    }

    #[test]
    fn test_export_bundle_files() {
        let mut session = EditorSession::new();
        session.upload("etcd.csv.yaml", CSV);
        session.upload("backup.crd.yaml", CRD);

        let bundle = session.export("alpha").unwrap();
        let names: Vec<&str> = bundle.files.iter().map(|f| f.file_name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "etcdoperator.v0.9.2.clusterserviceversion.yaml",
                "etcdoperator.package.yaml",
                "etcdbackups.etcd.database.coreos.com.crd.yaml",
            ]
        );
        let package = OperatorPackage::from_yaml(&bundle.files[1].content).unwrap();
        assert_eq!(package.channels[0].current_csv, "etcdoperator.v0.9.2");
        assert!(!bundle.files[0].content.contains("id:"));
    }

    #[test]
    fn test_export_rejects_crd_name_with_path() {
        let mut session = EditorSession::new();
        session.upload("etcd.csv.yaml", CSV);
        session.upload("evil.crd.yaml", &CRD.replace("etcdbackups.etcd.database.coreos.com", "../escaped"));

        let result = session.export("alpha");

        assert!(matches!(result, Err(CoreError::InvalidDocument { .. })));
    }

    #[test]
    fn test_write_to_stays_inside_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bundle");
        let bundle = ExportBundle {
            files: vec![
                ExportFile {
                    file_name: "ok.package.yaml".to_string(),
                    content: "packageName: ok\n".to_string(),
                },
                ExportFile {
                    file_name: "../escaped.crd.yaml".to_string(),
                    content: "kind: CustomResourceDefinition\n".to_string(),
                },
            ],
        };

        let result = bundle.write_to(&out);

        assert!(matches!(result, Err(CoreError::InvalidDocument { .. })));
        assert!(!dir.path().join("escaped.crd.yaml").exists());
        assert!(!out.join("ok.package.yaml").exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".opbundle").join("session.json");
        let mut session = EditorSession::new();
        session.upload("etcd.csv.yaml", CSV);

        session.save(&path).unwrap();
        let loaded = EditorSession::load(&path).unwrap();

        assert_eq!(loaded, session);
    }

    #[test]
    fn test_load_missing_session() {
        let dir = TempDir::new().unwrap();

        let result = EditorSession::load(&dir.path().join("missing.json"));

        assert!(matches!(result, Err(CoreError::SessionNotFound { .. })));
    }
}
