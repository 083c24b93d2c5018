//! Upload command - fold YAML files into the session

use console::style;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{load_session, save_session};
use crate::display::upload_line;
use crate::error::{CliError, Result};

pub fn run(session_path: &Path, paths: &[PathBuf]) -> Result<()> {
    let mut session = load_session(session_path)?;

    let files = collect_files(paths)?;
    if files.is_empty() {
        return Err(CliError::upload("no .yaml or .yml files found"));
    }

    let mut errored = 0;
    for file in &files {
        let text = std::fs::read_to_string(file)
            .map_err(|e| CliError::upload(format!("failed to read {}: {}", file.display(), e)))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        for record in session.upload(&file_name, &text) {
            if record.errored {
                errored += 1;
            }
            println!("{}", upload_line(&record));
        }
    }

    save_session(&session, session_path)?;

    println!();
    if errored > 0 {
        println!(
            "{} Processed {} file(s), {} document(s) could not be used",
            style("⚠").yellow(),
            files.len(),
            errored
        );
    } else {
        println!("{} Processed {} file(s)", style("✓").green(), files.len());
    }

    Ok(())
}

/// Expand directories into the YAML files below them, in a stable order
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(CliError::upload(format!("{} does not exist", path.display())));
        }
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| is_yaml(p))
            .collect();
        files.append(&mut found);
    }
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
