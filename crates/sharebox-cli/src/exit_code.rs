//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and automation.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments, emitted by clap)
#[allow(dead_code)]
pub const USAGE_ERROR: u8 = 2;

/// File or directory not found within the share
pub const NOT_FOUND: u8 = 3;

/// Permission denied on the share or a file in it
pub const PERMISSION_DENIED: u8 = 4;

/// Rejected input: illegal name, path escape, over-long path, share root as target
pub const INVALID_INPUT: u8 = 5;

/// Target already exists, or is the wrong kind of entry
pub const CONFLICT: u8 = 6;

/// Index bridge reported a failure
pub const INDEX_FAILED: u8 = 7;

/// Operation cancelled or interrupted
pub const CANCELLED: u8 = 8;

/// Stored checksum does not match the file content
pub const CHECKSUM_MISMATCH: u8 = 9;
