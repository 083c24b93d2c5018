//! Long-form description sections
//!
//! The CSV carries one markdown description. The editor works on three
//! logical sections of it: about the application, about the operator and
//! prerequisites. Splitting relies on the canonical section headers and
//! falls back to counting level-2 headers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Header opening the "about the operator" section
pub const ABOUT_OPERATOR_HEADER: &str = "## About this Operator";

/// Header opening the prerequisites section
pub const PREREQUISITES_HEADER: &str = "## Prerequisites for enabling this Operator";

static ABOUT_OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^## About this Operator").expect("valid regex"));

static PREREQUISITES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^## Prerequisites for enabling this Operator").expect("valid regex")
});

static LEVEL_TWO_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^## ").expect("valid regex"));

/// Which section of the description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DescriptionSection {
    AboutApplication,
    AboutOperator,
    Prerequisites,
}

/// Description split into its logical sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionSections {
    pub about_application: String,
    pub about_operator: String,
    pub prerequisites: String,
}

impl DescriptionSections {
    /// Split a markdown description
    pub fn split(description: &str) -> Self {
        let operator_at = ABOUT_OPERATOR_RE.find(description).map(|m| m.start());
        let prerequisites_at = PREREQUISITES_RE.find(description).map(|m| m.start());

        match (operator_at, prerequisites_at) {
            (Some(op), Some(pre)) if pre > op => Self {
                about_application: description[..op].to_string(),
                about_operator: description[op..pre].to_string(),
                prerequisites: description[pre..].to_string(),
            },
            // Prerequisites appearing before the operator header stay in
            // the application text
            (Some(op), _) => Self {
                about_application: description[..op].to_string(),
                about_operator: description[op..].to_string(),
                prerequisites: String::new(),
            },
            (None, Some(pre)) => Self {
                about_application: description[..pre].to_string(),
                about_operator: String::new(),
                prerequisites: description[pre..].to_string(),
            },
            (None, None) => Self::split_by_headers(description),
        }
    }

    fn split_by_headers(description: &str) -> Self {
        let segments = header_segments(description);

        let (application, operator, prerequisites) = if segments.len() >= 7 {
            (&segments[..3], &segments[3..5], &segments[5..])
        } else if segments.len() >= 5 {
            (&segments[..3], &segments[3..], &segments[..0])
        } else {
            return Self {
                about_application: description.to_string(),
                ..Self::default()
            };
        };

        Self {
            about_application: application.concat(),
            about_operator: operator.concat(),
            prerequisites: prerequisites.concat(),
        }
    }

    /// Join the sections back into one description
    ///
    /// A newline is inserted between sections when the preceding text
    /// does not end with one, so headers always start a line.
    pub fn join(&self) -> String {
        let mut description = String::new();
        for section in [
            &self.about_application,
            &self.about_operator,
            &self.prerequisites,
        ] {
            if section.is_empty() {
                continue;
            }
            if !description.is_empty() && !description.ends_with('\n') {
                description.push('\n');
            }
            description.push_str(section);
        }
        description
    }

    /// Get a section by name
    pub fn get(&self, section: DescriptionSection) -> &str {
        match section {
            DescriptionSection::AboutApplication => &self.about_application,
            DescriptionSection::AboutOperator => &self.about_operator,
            DescriptionSection::Prerequisites => &self.prerequisites,
        }
    }

    /// Replace a section
    pub fn set(&mut self, section: DescriptionSection, text: impl Into<String>) {
        let slot = match section {
            DescriptionSection::AboutApplication => &mut self.about_application,
            DescriptionSection::AboutOperator => &mut self.about_operator,
            DescriptionSection::Prerequisites => &mut self.prerequisites,
        };
        *slot = text.into();
    }

    pub fn is_empty(&self) -> bool {
        self.about_application.is_empty()
            && self.about_operator.is_empty()
            && self.prerequisites.is_empty()
    }
}

/// Split at every line-anchored `## ` header, keeping each header with the
/// text that follows it
fn header_segments(description: &str) -> Vec<&str> {
    let mut bounds: Vec<usize> = LEVEL_TWO_HEADER_RE
        .find_iter(description)
        .map(|m| m.start())
        .filter(|&start| start > 0)
        .collect();
    bounds.insert(0, 0);
    bounds.push(description.len());

    bounds
        .windows(2)
        .map(|w| &description[w[0]..w[1]])
        .filter(|segment| !segment.is_empty())
        .collect()
}
