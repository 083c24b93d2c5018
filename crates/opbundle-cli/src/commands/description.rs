//! Description command - show or replace description sections

use console::style;
use opbundle_core::DescriptionSection;
use std::path::Path;

use super::{load_session, save_session};
use crate::error::{CliError, Result};

const SECTIONS: [(DescriptionSection, &str); 3] = [
    (DescriptionSection::AboutApplication, "About the managed application"),
    (DescriptionSection::AboutOperator, "About this Operator"),
    (DescriptionSection::Prerequisites, "Prerequisites for enabling this Operator"),
];

pub fn run(
    session_path: &Path,
    section: Option<DescriptionSection>,
    file: Option<&Path>,
) -> Result<()> {
    let mut session = load_session(session_path)?;

    let (Some(section), Some(file)) = (section, file) else {
        for (section, title) in SECTIONS {
            println!("{}", style(title).cyan().bold());
            let text = session.description.get(section);
            if text.trim().is_empty() {
                println!("  {}", style("(empty)").dim());
            } else {
                for line in text.lines() {
                    println!("  {}", line);
                }
            }
            println!();
        }
        return Ok(());
    };

    let text = std::fs::read_to_string(file).map_err(|e| CliError::Io {
        message: format!("failed to read {}: {}", file.display(), e),
    })?;
    session.set_description_section(section, &text);
    save_session(&session, session_path)?;

    let title = SECTIONS
        .iter()
        .find(|(s, _)| *s == section)
        .map_or("Description", |(_, t)| *t);
    println!("{} Updated \"{}\"", style("✓").green(), title);

    Ok(())
}
