//! Set command - edit manifest and package fields

use console::style;
use opbundle_core::parse_set_values;
use std::path::Path;

use super::{load_session, save_session};
use crate::error::Result;

pub fn run(session_path: &Path, values: &[String]) -> Result<()> {
    let mut session = load_session(session_path)?;
    let edits = parse_set_values(values)?;

    for edit in &edits {
        session.set_field(&edit.path, edit.value.clone())?;
        println!("{} {} = {}", style("✓").green(), style(&edit.path).bold(), edit.value);
    }

    save_session(&session, session_path)
}
