//! Read or replace the comment stored with a file.
//!
//! Setting a comment recomputes the file's checksum, so the sidecar is
//! always fresh afterwards.
//!
//! # Examples
//!
//! ```bash
//! sharebox comment / report.pdf
//! sharebox comment / report.pdf --set "Q3 figures, final"
//! sharebox comment / report.pdf --set ""
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory containing the file (`/` for the root)
    pub dir: String,

    /// File name
    pub name: String,

    /// Replace the comment with this text
    #[arg(long, value_name = "TEXT")]
    pub set: Option<String>,
}

#[instrument(level = "info", name = "cmd::comment", skip_all, fields(dir = %args.dir, name = %args.name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    let dir = dir_arg(Some(&args.dir));
    match &args.set {
        Some(comment) => session.ops.set_comment(dir, &args.name, comment, session.index)?,
        None => println!("{}", session.ops.get_comment(dir, &args.name)?),
    }
    Ok(())
}
