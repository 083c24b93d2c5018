//! Validator tree nodes
//!
//! A validator tree mirrors the shape of the document it checks. Each node
//! is one of a closed set of rule kinds; the evaluator matches on them
//! exhaustively.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value as JsonValue;

use super::error::FieldError;

/// Default message for an empty required field
pub const REQUIRED_MESSAGE: &str = "This field is required";

/// Default message for an empty required list
pub const REQUIRED_LIST_MESSAGE: &str = "At least one value is required";

/// Plain check on a single value, returning an error message
pub type CheckFn = fn(&JsonValue) -> Option<String>;

/// Check with access to the whole document: `(value, document, rule)`
pub type ContextFn = fn(&JsonValue, &JsonValue, &ContextualRule) -> Option<FieldError>;

/// The content check of a leaf, applied after the empty-value check
///
/// A leaf holds at most one content check, so a pattern and a callback
/// can not be combined on the same field.
#[derive(Debug, Clone)]
pub enum LeafCheck {
    None,
    Regex { pattern: Regex, message: String },
    Callback(CheckFn),
}

/// Scalar field rule
#[derive(Debug, Clone)]
pub struct LeafRule {
    pub required: bool,
    pub required_message: Option<String>,
    pub check: LeafCheck,
}

/// List rule; every item is checked field by field against `items`
#[derive(Debug, Clone)]
pub struct ArrayRule {
    pub required: bool,
    pub required_message: Option<String>,
    pub items: IndexMap<String, ValidatorNode>,
}

/// Free-form key/value map rule (labels, selectors)
#[derive(Debug, Clone)]
pub struct ObjectPropsRule {
    pub required: bool,
    pub required_message: Option<String>,
    pub key: Box<ValidatorNode>,
    pub value: Box<ValidatorNode>,
}

/// Rule needing sibling context from the whole document
#[derive(Debug, Clone)]
pub struct ContextualRule {
    pub required: bool,
    pub required_message: Option<String>,
    pub check: ContextFn,
}

/// A node of the validator tree
#[derive(Debug, Clone)]
pub enum ValidatorNode {
    Leaf(LeafRule),
    ArrayOf(ArrayRule),
    ObjectProps(ObjectPropsRule),
    Contextual(ContextualRule),
    Fields(IndexMap<String, ValidatorNode>),
}

// =========================================================================
// Authoring helpers
// =========================================================================

/// Optional leaf without content check
pub fn leaf() -> LeafRule {
    LeafRule {
        required: false,
        required_message: None,
        check: LeafCheck::None,
    }
}

/// Nested map of field name to node
pub fn fields<const N: usize>(entries: [(&str, ValidatorNode); N]) -> ValidatorNode {
    ValidatorNode::Fields(
        entries
            .into_iter()
            .map(|(name, node)| (name.to_string(), node))
            .collect(),
    )
}

/// Optional list whose items are checked field by field
pub fn array_of<const N: usize>(items: [(&str, ValidatorNode); N]) -> ArrayRule {
    ArrayRule {
        required: false,
        required_message: None,
        items: items
            .into_iter()
            .map(|(name, node)| (name.to_string(), node))
            .collect(),
    }
}

/// Optional key/value map
pub fn object_props(key: impl Into<ValidatorNode>, value: impl Into<ValidatorNode>) -> ObjectPropsRule {
    ObjectPropsRule {
        required: false,
        required_message: None,
        key: Box::new(key.into()),
        value: Box::new(value.into()),
    }
}

/// Contextual rule
pub fn contextual(check: ContextFn) -> ContextualRule {
    ContextualRule {
        required: false,
        required_message: None,
        check,
    }
}

impl LeafRule {
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn required_with(mut self, message: &str) -> Self {
        self.required = true;
        self.required_message = Some(message.to_string());
        self
    }

    /// Content must match `pattern`
    ///
    /// Patterns are authored with the tree; an invalid one is a programming
    /// error.
    pub fn regex(mut self, pattern: &str, message: &str) -> Self {
        self.check = LeafCheck::Regex {
            pattern: Regex::new(pattern).expect("validator patterns are valid regexes"),
            message: message.to_string(),
        };
        self
    }

    pub fn check(mut self, check: CheckFn) -> Self {
        self.check = LeafCheck::Callback(check);
        self
    }
}

impl ArrayRule {
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn required_with(mut self, message: &str) -> Self {
        self.required = true;
        self.required_message = Some(message.to_string());
        self
    }
}

impl ObjectPropsRule {
    pub fn required_with(mut self, message: &str) -> Self {
        self.required = true;
        self.required_message = Some(message.to_string());
        self
    }
}

impl ContextualRule {
    pub fn required_with(mut self, message: &str) -> Self {
        self.required = true;
        self.required_message = Some(message.to_string());
        self
    }

    /// Message to report when the field is empty
    pub fn required_message(&self) -> &str {
        self.required_message.as_deref().unwrap_or(REQUIRED_MESSAGE)
    }
}

impl From<LeafRule> for ValidatorNode {
    fn from(rule: LeafRule) -> Self {
        ValidatorNode::Leaf(rule)
    }
}

impl From<ArrayRule> for ValidatorNode {
    fn from(rule: ArrayRule) -> Self {
        ValidatorNode::ArrayOf(rule)
    }
}

impl From<ObjectPropsRule> for ValidatorNode {
    fn from(rule: ObjectPropsRule) -> Self {
        ValidatorNode::ObjectProps(rule)
    }
}

impl From<ContextualRule> for ValidatorNode {
    fn from(rule: ContextualRule) -> Self {
        ValidatorNode::Contextual(rule)
    }
}
