//! Validate command - check the manifest and package

use std::path::Path;

use super::{load_session, save_session};
use crate::display::ValidationReport;
use crate::error::{CliError, Result};

pub fn run(session_path: &Path, json_output: bool, strict: bool) -> Result<()> {
    let mut session = load_session(session_path)?;
    let result = session.validate();
    // Section statuses change on validation
    save_session(&session, session_path)?;

    let report = ValidationReport::from_session(&result);

    if json_output {
        let json = serde_json::to_string_pretty(&result).map_err(|e| CliError::Other {
            message: e.to_string(),
        })?;
        println!("{}", json);
    } else {
        report.display();
        println!();
        report.print_summary();
    }

    check_report(&report, strict)
}

/// Turn a failed report into the matching error
pub(crate) fn check_report(report: &ValidationReport, strict: bool) -> Result<()> {
    let (errors, warnings) = report.summary();
    if errors > 0 {
        return Err(CliError::validation_with_help(
            format!("{} error(s) found", errors),
            "Run `opbundle set key=value` or upload the missing objects to fix them",
        ));
    }
    if strict && report.has_warnings() {
        return Err(CliError::validation_with_help(
            format!("{} warning(s) in strict mode", warnings),
            "Fill in the recommended fields or run without --strict",
        ));
    }
    Ok(())
}
