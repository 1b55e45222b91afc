//! Download a file from a share.
//!
//! # Examples
//!
//! ```bash
//! sharebox get / report.pdf > report.pdf
//! sharebox get docs final.txt -o ./final.txt
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};
use crate::output::format_size;

#[derive(ClapArgs)]
pub struct Args {
    /// Directory containing the file (`/` for the root)
    pub dir: String,

    /// File name
    pub name: String,

    /// Write to this path instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[instrument(level = "info", name = "cmd::get", skip_all, fields(dir = %args.dir, name = %args.name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    let mut download = session.ops.download(dir_arg(Some(&args.dir)), &args.name)?;
    let name = download.name().to_string();
    let checksum = download.checksum().to_string();
    let len = download.len();

    match &args.output {
        Some(path) => {
            let mut out = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            io::copy(&mut download, &mut out)?;
            out.sync_all()?;
            if !session.quiet {
                let checksum = if checksum.is_empty() { "none" } else { checksum.as_str() };
                eprintln!(
                    "Saved {name} ({}) to {}, md5 {checksum}",
                    format_size(len),
                    path.display()
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            io::copy(&mut download, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}
