//! Delete a file or directory tree from a share.
//!
//! Sidecars go with their files, and every removed file is withdrawn from
//! the index. Deleting something that is already gone succeeds.
//!
//! # Examples
//!
//! ```bash
//! sharebox rm / old.iso
//! sharebox rm photos 2019
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory containing the entry (`/` for the root)
    pub dir: String,

    /// Name of the file or directory to delete
    pub name: String,
}

#[instrument(level = "info", name = "cmd::rm", skip_all, fields(dir = %args.dir, name = %args.name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    let stats = session.ops.delete(dir_arg(Some(&args.dir)), &args.name)?;
    if !session.quiet {
        eprintln!(
            "Deleted {} files and {} directories",
            stats.files_deleted, stats.directories_deleted
        );
    }
    Ok(())
}
