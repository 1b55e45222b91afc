use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory the file currently lives in (`/` for the root)
    pub source_dir: String,

    /// Directory to move the file into (`/` for the root)
    pub dest_dir: String,

    /// File name, kept unchanged
    pub name: String,
}

#[instrument(level = "info", name = "cmd::mv", skip_all, fields(source = %args.source_dir, dest = %args.dest_dir, name = %args.name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    session.ops.move_file(
        dir_arg(Some(&args.source_dir)),
        dir_arg(Some(&args.dest_dir)),
        &args.name,
        session.index,
    )?;
    Ok(())
}
