//! Print the MD5 checksum stored with a file.
//!
//! The stored value is served as-is, even if the file changed since it was
//! written. `--verify` recomputes the digest and fails on a mismatch.
//!
//! # Examples
//!
//! ```bash
//! sharebox checksum / report.pdf
//! sharebox checksum / report.pdf --verify
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use sharebox_core::checksum::digest_reader;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory containing the file (`/` for the root)
    pub dir: String,

    /// File name
    pub name: String,

    /// Recompute the checksum from the content and compare
    #[arg(long)]
    pub verify: bool,
}

/// The stored checksum no longer matches the file content.
#[derive(Debug)]
pub struct ChecksumMismatch {
    pub name: String,
    pub stored: String,
    pub actual: String,
}

impl std::fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stored = if self.stored.is_empty() { "none" } else { &self.stored };
        write!(
            f,
            "Checksum mismatch for '{}': stored {stored}, content {}",
            self.name, self.actual
        )
    }
}

impl std::error::Error for ChecksumMismatch {}

#[instrument(level = "info", name = "cmd::checksum", skip_all, fields(dir = %args.dir, name = %args.name))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    let dir = dir_arg(Some(&args.dir));

    if !args.verify {
        println!("{}", session.ops.get_checksum(dir, &args.name)?);
        return Ok(());
    }

    let download = session.ops.download(dir, &args.name)?;
    let stored = download.checksum().to_string();
    let actual = digest_reader(download)?.to_hex();
    if stored != actual {
        return Err(ChecksumMismatch {
            name: args.name.clone(),
            stored,
            actual,
        }
        .into());
    }

    println!("{actual}");
    if !session.quiet {
        eprintln!("OK");
    }
    Ok(())
}
