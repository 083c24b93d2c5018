//! Opbundle Core - Reconciliation and validation of Operator bundle manifests
//!
//! This crate provides the building blocks of the opbundle editor:
//! - `Manifest`: The ClusterServiceVersion document with dotted-path access
//! - `classify`: Semantic type of uploaded Kubernetes objects
//! - `merge`: Key-based reconciliation of uploaded fragments
//! - `normalize`: Import, validation and export views of a manifest
//! - `validation`: Declarative validator trees and their evaluation
//! - `EditorSession`: Persisted editing state tying it all together

pub mod classify;
pub mod config;
pub mod description;
pub mod error;
pub mod examples;
pub mod ids;
pub mod manifest;
pub mod merge;
pub mod normalize;
pub mod package;
pub mod placeholder;
pub mod rbac;
pub mod session;
pub mod status;
pub mod upload;
pub mod validation;

pub use classify::{Classification, ObjectType, classify};
pub use config::EditorConfig;
pub use description::{DescriptionSection, DescriptionSections};
pub use error::{CoreError, Result};
pub use ids::{ClockIds, IdGenerator, SequentialIds};
pub use manifest::{FieldEdit, Manifest, parse_set_values};
pub use merge::{deep_merge, merge_by_key};
pub use normalize::{normalize_for_export, normalize_for_validation, normalize_imported};
pub use package::{Channel, OperatorPackage};
pub use session::{EditorSession, ExportBundle, ExportFile, SessionReport};
pub use status::{Section, SectionStatus};
pub use upload::{UploadRecord, mark_replaced_objects};
pub use validation::{FieldError, FlatError, ValidatorNode};
