//! CLI commands

pub mod description;
pub mod export;
pub mod history;
pub mod init;
pub mod set;
pub mod upload;
pub mod validate;

use opbundle_core::EditorSession;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Load the session a command works on
pub(crate) fn load_session(path: &Path) -> Result<EditorSession> {
    debug!(path = %path.display(), "Loading session");
    Ok(EditorSession::load(path)?)
}

/// Autosave the session after a command changed it
pub(crate) fn save_session(session: &EditorSession, path: &Path) -> Result<()> {
    debug!(path = %path.display(), "Saving session");
    Ok(session.save(path)?)
}
