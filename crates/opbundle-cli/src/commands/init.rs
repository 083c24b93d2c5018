//! Init command - start a new editing session

use console::style;
use opbundle_core::EditorSession;
use std::path::Path;

use super::save_session;
use crate::error::{CliError, Result};

pub fn run(session_path: &Path, force: bool) -> Result<()> {
    if session_path.exists() && !force {
        return Err(CliError::session_with_help(
            format!("a session already exists at {}", session_path.display()),
            "Use --force to discard it and start over",
        ));
    }

    let session = EditorSession::new();
    save_session(&session, session_path)?;

    println!(
        "{} Started a new session in {}",
        style("✓").green(),
        style(session_path.display()).cyan()
    );
    println!();
    println!("Next steps:");
    println!("  opbundle upload <files>     # Add CSV, CRD, RBAC, deployment or package files");
    println!("  opbundle set key=value      # Edit manifest fields");
    println!("  opbundle validate           # Check the manifest");
    println!("  opbundle export             # Write the bundle");

    Ok(())
}
