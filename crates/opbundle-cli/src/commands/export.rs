//! Export command - write the bundle files

use console::style;
use opbundle_core::EditorConfig;
use std::path::Path;

use super::validate::check_report;
use super::{load_session, save_session};
use crate::display::ValidationReport;
use crate::error::Result;

pub fn run(
    session_path: &Path,
    output: &Path,
    to_stdout: bool,
    force: bool,
    config: &EditorConfig,
) -> Result<()> {
    let mut session = load_session(session_path)?;

    let result = session.validate();
    save_session(&session, session_path)?;
    let report = ValidationReport::from_session(&result);

    if force {
        if report.has_errors() {
            eprintln!(
                "{} Exporting despite {} validation error(s)",
                style("⚠").yellow(),
                result.error_count()
            );
        }
    } else {
        if report.has_errors() {
            report.display();
            println!();
        }
        check_report(&report, config.strict)?;
    }

    let bundle = session.export(&config.default_channel)?;

    if to_stdout {
        for file in &bundle.files {
            println!("# Source: {}", file.file_name);
            println!("---");
            print!("{}", file.content);
        }
        return Ok(());
    }

    bundle.write_to(output)?;
    for file in &bundle.files {
        println!(
            "{} {}",
            style("✓").green(),
            output.join(&file.file_name).display()
        );
    }
    println!();
    println!(
        "Exported {} file(s) to {}",
        bundle.files.len(),
        style(output.display()).cyan()
    );

    Ok(())
}
