pub mod checksum;
pub mod comment;
pub mod completions;
pub mod get;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod put;
pub mod rename;
pub mod rm;
pub mod shares;

use sharebox_core::ShareOperations;

/// State shared by every subcommand.
pub struct Session {
    pub ops: ShareOperations,
    /// Forwarded as the `index` flag of mutating operations.
    pub index: bool,
    pub quiet: bool,
}

/// Map a directory argument onto the core's optional directory.
///
/// An absent argument and `/` both denote the share root.
pub fn dir_arg(dir: Option<&str>) -> Option<&str> {
    dir.filter(|d| !d.is_empty() && *d != "/")
}
