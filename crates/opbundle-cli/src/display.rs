//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Validation errors grouped by editor section
//! - Upload records and history

use console::{StyledObject, style};
use indexmap::IndexMap;
use opbundle_core::status::errors_by_section;
use opbundle_core::{FlatError, Section, SectionStatus, SessionReport, UploadRecord};

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A validation issue with its field path
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub section: Section,
    pub path: String,
    pub message: String,
}

/// Grouped validation results for display
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub statuses: IndexMap<Section, SectionStatus>,
}

impl ValidationReport {
    /// Build the report of a session validation
    pub fn from_session(report: &SessionReport) -> Self {
        let mut issues = Vec::new();

        if let Some(errors) = &report.manifest_errors {
            for (section, errors) in errors_by_section(errors) {
                issues.extend(errors.into_iter().map(|e| issue(Severity::Error, section, e)));
            }
        }
        if let Some(errors) = &report.package_errors {
            issues.extend(
                errors
                    .flatten()
                    .into_iter()
                    .map(|e| issue(Severity::Error, Section::Package, e)),
            );
        }
        issues.extend(
            report
                .warnings
                .iter()
                .cloned()
                .map(|e| issue(Severity::Warning, Section::for_path(&e.path), e)),
        );

        Self {
            issues,
            statuses: report.sections.clone(),
        }
    }

    /// Display issues grouped by section, in section order
    pub fn display(&self) {
        for section in Section::ALL {
            let status = self.statuses.get(&section).copied().unwrap_or_default();
            println!("{} {}", status_icon(status), style(section.title()).cyan().bold());

            for issue in self.issues.iter().filter(|i| i.section == section) {
                let icon = match issue.severity {
                    Severity::Error => style("✗").red(),
                    Severity::Warning => style("⚠").yellow(),
                };

                let path_display = if issue.path.is_empty() {
                    String::new()
                } else {
                    format!(" at {}", style(&issue.path).dim())
                };

                println!("    {} {}{}", icon, issue.message, path_display);
            }
        }
    }

    /// Get summary counts
    pub fn summary(&self) -> (usize, usize) {
        let errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let warnings = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count();
        (errors, warnings)
    }

    /// Print summary line
    pub fn print_summary(&self) {
        let (errors, warnings) = self.summary();
        if errors > 0 {
            println!(
                "{} Validation failed: {} error(s), {} warning(s)",
                style("✗").red().bold(),
                errors,
                warnings
            );
        } else if warnings > 0 {
            println!(
                "{} Validation passed with {} warning(s)",
                style("⚠").yellow().bold(),
                warnings
            );
        } else {
            println!("{} Validation passed!", style("✓").green().bold());
        }
    }

    /// Check if there are any errors (not warnings)
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}

fn issue(severity: Severity, section: Section, error: FlatError) -> ValidationIssue {
    ValidationIssue {
        severity,
        section,
        path: error.path,
        message: error.message,
    }
}

fn status_icon(status: SectionStatus) -> StyledObject<&'static str> {
    match status {
        SectionStatus::Empty => style("○").dim(),
        SectionStatus::Modified => style("●").blue(),
        SectionStatus::AllGood => style("✓").green(),
        SectionStatus::Errors => style("✗").red(),
    }
}

/// One line describing an upload record
pub fn upload_line(record: &UploadRecord) -> String {
    let icon = if record.errored {
        style("✗").red()
    } else if record.overwritten {
        style("↺").dim()
    } else {
        style("✓").green()
    };
    format!("{} {} {}", icon, style(&record.file_name).bold(), record.status)
}

/// Print the upload history as a table
pub fn print_history(records: &[UploadRecord]) {
    println!(
        "{:<6} {:<32} {:<30} {:<12}",
        style("ID").bold(),
        style("FILE").bold(),
        style("OBJECT").bold(),
        style("STATE").bold()
    );

    for record in records {
        let object = match record.object_type {
            Some(object_type) => format!("{}/{}", object_type, record.name),
            None => "-".to_string(),
        };
        let state = if record.errored {
            style("errored").red()
        } else if record.overwritten {
            style("overwritten").dim()
        } else {
            style("current").green()
        };

        println!(
            "{:<6} {:<32} {:<30} {:<12}",
            record.id, record.file_name, object, state
        );
    }
}
