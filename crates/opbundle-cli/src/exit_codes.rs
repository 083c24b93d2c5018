//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - the manifest or package has errors
pub const VALIDATION_ERROR: i32 = 2;

/// Upload error - an uploaded file could not be read or used
pub const UPLOAD_ERROR: i32 = 3;

/// Session error - no session, or a corrupt session file
pub const SESSION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
