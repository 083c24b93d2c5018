//! Declarative validation of manifests and packages
//!
//! A validator tree ([`ValidatorNode`]) mirrors the document it checks.
//! Evaluating it yields a [`FieldError`] tree of the same shape, or `None`
//! when the document is valid. Validation failures are data, never `Err`.

pub mod engine;
pub mod error;
pub mod node;
pub mod rules;
pub mod tree;

pub use engine::{evaluate, first_error, is_empty_value, validate_all};
pub use error::{EntryError, FieldError, FlatError, ItemError};
pub use node::{
    ArrayRule, ContextualRule, LeafCheck, LeafRule, ObjectPropsRule, REQUIRED_LIST_MESSAGE,
    REQUIRED_MESSAGE, ValidatorNode, array_of, contextual, fields, leaf, object_props,
};
pub use tree::{csv_validator, package_validator};
