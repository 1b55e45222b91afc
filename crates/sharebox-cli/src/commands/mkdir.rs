//! Create a directory inside a share.
//!
//! # Examples
//!
//! ```bash
//! sharebox mkdir / photos
//! sharebox mkdir photos 2024
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Parent directory within the share (`/` for the root)
    pub dir: String,

    /// Name of the new directory
    pub name: String,
}

#[instrument(level = "info", name = "cmd::mkdir", skip_all, fields(dir = %args.dir, name = %args.name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    session.ops.create_directory(dir_arg(Some(&args.dir)), &args.name)?;
    Ok(())
}
