//! History command - show upload history

use console::style;
use std::path::Path;

use super::load_session;
use crate::display::print_history;
use crate::error::{CliError, Result};

pub fn run(session_path: &Path, json_output: bool) -> Result<()> {
    let session = load_session(session_path)?;

    if json_output {
        let json = serde_json::to_string_pretty(&session.uploads).map_err(|e| CliError::Other {
            message: e.to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    if session.uploads.is_empty() {
        println!("{}", style("No uploads yet").dim());
        return Ok(());
    }

    print_history(&session.uploads);
    Ok(())
}
