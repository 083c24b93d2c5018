//! Integration tests for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const CSV: &str = r#"apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: etcdoperator.v0.9.2
  annotations:
    capabilities: Full Lifecycle
spec:
  displayName: etcd
  version: 0.9.2
  description: |
    Etcd is a distributed key value store.
"#;

const CRD: &str = r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: etcdclusters.etcd.database.coreos.com
spec:
  group: etcd.database.coreos.com
  names:
    kind: EtcdCluster
    plural: etcdclusters
  versions:
    - name: v1beta2
      served: true
      storage: true
"#;

const ROLE_AND_BINDING: &str = r#"apiVersion: rbac.authorization.k8s.io/v1
kind: Role
metadata:
  name: etcd-operator
rules:
  - apiGroups: [""]
    resources: ["pods"]
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
    name: etcd-operator
"#;

/// A session in its own temp dir, with config isolated from the user's
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn session(&self) -> PathBuf {
        self.path().join("session.json")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Run opbundle against this workspace's session
    fn opbundle(&self, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_opbundle"))
            .arg("--session")
            .arg(self.session())
            .args(args)
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env_remove("OPBUNDLE_SESSION")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute opbundle")
    }

    fn initialized() -> Self {
        let ws = Self::new();
        let output = ws.opbundle(&["init"]);
        assert!(output.status.success(), "init failed: {:?}", output);
        ws
    }

    fn session_json(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.session()).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod init_command {
    use super::*;

    #[test]
    fn test_init_creates_session() {
        let ws = Workspace::new();

        let output = ws.opbundle(&["init"]);

        assert!(output.status.success());
        assert!(ws.session().exists());
        assert!(stdout(&output).contains("Started a new session"));
    }

    #[test]
    fn test_init_twice_requires_force() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&["init"]);
        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("--force"));

        let output = ws.opbundle(&["init", "--force"]);
        assert!(output.status.success());
    }

    #[test]
    fn test_commands_without_session_fail() {
        let ws = Workspace::new();

        let output = ws.opbundle(&["validate"]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("opbundle init"));
    }
}

mod upload_command {
    use super::*;

    #[test]
    fn test_upload_csv_merges_into_manifest() {
        let ws = Workspace::initialized();
        let csv = ws.write("etcd.csv.yaml", CSV);

        let output = ws.opbundle(&["upload", csv.to_str().unwrap()]);

        assert!(output.status.success(), "upload failed: {}", stderr(&output));
        assert!(stdout(&output).contains("Parsed ClusterServiceVersion"));

        let session = ws.session_json();
        assert_eq!(session["manifest"]["metadata"]["name"], "etcdoperator");
        assert_eq!(session["manifest"]["spec"]["displayName"], "etcd");
        assert_eq!(session["uploads"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_upload_directory_picks_up_yaml() {
        let ws = Workspace::initialized();
        let dir = ws.path().join("manifests");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("crd.yaml"), CRD).unwrap();
        std::fs::write(dir.join("rbac.yml"), ROLE_AND_BINDING).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let output = ws.opbundle(&["upload", dir.to_str().unwrap()]);

        assert!(output.status.success(), "upload failed: {}", stderr(&output));
        let session = ws.session_json();
        assert_eq!(session["uploads"].as_array().unwrap().len(), 3);
        assert_eq!(
            session["manifest"]["spec"]["customresourcedefinitions"]["owned"][0]["kind"],
            "EtcdCluster"
        );
        assert_eq!(
            session["manifest"]["spec"]["install"]["spec"]["permissions"][0]["serviceAccountName"],
            "etcd-operator"
        );
    }

    #[test]
    fn test_upload_unsupported_and_broken_files() {
        let ws = Workspace::initialized();
        let unknown = ws.write("widget.yaml", "kind: Widget\nmetadata:\n  name: w\n");
        let broken = ws.write("broken.yaml", "kind: [unclosed\n");

        let output = ws.opbundle(&[
            "upload",
            unknown.to_str().unwrap(),
            broken.to_str().unwrap(),
        ]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("Unsupported file"));
        assert!(out.contains("Parsing error"));
        assert!(out.contains("could not be used"));
    }

    #[test]
    fn test_upload_missing_file() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&["upload", "/definitely/not/here.yaml"]);

        assert_eq!(output.status.code(), Some(3));
    }
}

mod set_command {
    use super::*;

    #[test]
    fn test_set_manifest_and_package_fields() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&[
            "set",
            "spec.displayName=Demo",
            "spec.keywords=[\"demo\"]",
            "package.packageName=demo",
        ]);

        assert!(output.status.success(), "set failed: {}", stderr(&output));
        let session = ws.session_json();
        assert_eq!(session["manifest"]["spec"]["displayName"], "Demo");
        assert_eq!(session["manifest"]["spec"]["keywords"][0], "demo");
        assert_eq!(session["package"]["packageName"], "demo");
        assert_eq!(session["sections"]["General"], "Modified");
    }

    #[test]
    fn test_set_rejects_malformed_edit() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&["set", "no-equals-sign"]);

        assert_eq!(output.status.code(), Some(64));
    }
}

mod description_command {
    use super::*;

    #[test]
    fn test_replace_and_show_section() {
        let ws = Workspace::initialized();
        let text = ws.write("operator.md", "Manages etcd clusters.\n");

        let output = ws.opbundle(&[
            "description",
            "--section",
            "operator",
            "--file",
            text.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "description failed: {}", stderr(&output));

        let output = ws.opbundle(&["description"]);
        let out = stdout(&output);
        assert!(out.contains("About this Operator"));
        assert!(out.contains("Manages etcd clusters."));

        let session = ws.session_json();
        let description = session["manifest"]["spec"]["description"].as_str().unwrap();
        assert!(description.contains("Manages etcd clusters."));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_default_session_fails() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&["validate"]);

        assert_eq!(output.status.code(), Some(2));
        let out = stdout(&output);
        assert!(out.contains("Validation failed"));
        assert!(out.contains("Deployments"));
        assert!(out.contains("Recommended field is empty"));
    }

    #[test]
    fn test_validate_json_output() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&["validate", "--json"]);

        assert_eq!(output.status.code(), Some(2));
        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        assert!(json.get("manifestErrors").is_some());
        assert!(json["warnings"].as_array().unwrap().len() > 0);
        assert_eq!(json["sections"]["Package"], "Errors");
    }

    #[test]
    fn test_validate_saves_section_statuses() {
        let ws = Workspace::initialized();

        ws.opbundle(&["validate"]);

        let session = ws.session_json();
        assert_eq!(session["sections"]["Deployments"], "Errors");
    }
}

mod history_command {
    use super::*;

    #[test]
    fn test_history_lists_uploads() {
        let ws = Workspace::initialized();
        let csv = ws.write("etcd.csv.yaml", CSV);
        ws.opbundle(&["upload", csv.to_str().unwrap()]);
        ws.opbundle(&["upload", csv.to_str().unwrap()]);

        let output = ws.opbundle(&["history", "--json"]);

        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["overwritten"], true);
        assert_eq!(records[1]["overwritten"], false);
        assert_eq!(records[1]["type"], "ClusterServiceVersion");
    }

    #[test]
    fn test_history_empty() {
        let ws = Workspace::initialized();

        let output = ws.opbundle(&["history"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("No uploads yet"));
    }
}

mod export_command {
    use super::*;

    fn named_session() -> Workspace {
        let ws = Workspace::initialized();
        let output = ws.opbundle(&["set", "metadata.name=demo-operator", "spec.version=1.0.0"]);
        assert!(output.status.success(), "set failed: {}", stderr(&output));
        ws
    }

    #[test]
    fn test_export_refuses_invalid_session() {
        let ws = named_session();
        let out_dir = ws.path().join("bundle");

        let output = ws.opbundle(&["export", "-o", out_dir.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(2));
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_export_force_writes_bundle() {
        let ws = named_session();
        let out_dir = ws.path().join("bundle");

        let output = ws.opbundle(&["export", "--force", "-o", out_dir.to_str().unwrap()]);

        assert!(output.status.success(), "export failed: {}", stderr(&output));
        let csv = out_dir.join("demo-operator.v1.0.0.clusterserviceversion.yaml");
        let package = out_dir.join("demo-operator.package.yaml");
        assert!(csv.exists());
        assert!(package.exists());

        let package: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(package).unwrap()).unwrap();
        assert_eq!(package["packageName"], "demo-operator");
        assert_eq!(package["defaultChannel"], "alpha");
        assert_eq!(package["channels"][0]["currentCSV"], "demo-operator.v1.0.0");
    }

    #[test]
    fn test_export_stdout_includes_uploaded_crd() {
        let ws = named_session();
        let crd = ws.write("crd.yaml", CRD);
        ws.opbundle(&["upload", crd.to_str().unwrap()]);

        let output = ws.opbundle(&["export", "--force", "--stdout"]);

        assert!(output.status.success(), "export failed: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("# Source: demo-operator.v1.0.0.clusterserviceversion.yaml"));
        assert!(out.contains("# Source: etcdclusters.etcd.database.coreos.com.crd.yaml"));
    }
}
