use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory containing the file (`/` for the root)
    pub dir: String,

    /// Current file name
    pub old_name: String,

    /// New file name
    pub new_name: String,
}

#[instrument(level = "info", name = "cmd::rename", skip_all, fields(dir = %args.dir, old = %args.old_name, new = %args.new_name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    session.ops.rename(
        dir_arg(Some(&args.dir)),
        &args.old_name,
        &args.new_name,
        session.index,
    )?;
    Ok(())
}
