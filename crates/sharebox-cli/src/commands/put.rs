//! Upload a local file (or stdin) into a share.
//!
//! The upload never replaces an existing file. On success the content's
//! MD5 checksum is printed to stdout.
//!
//! # Examples
//!
//! ```bash
//! sharebox put / ./report.pdf
//! sharebox put docs ./draft.txt --name final.txt --comment "Reviewed copy"
//!
//! # From stdin; without --name the file is called newFile
//! tar c ./photos | sharebox put / - --name photos.tar
//! ```

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{Session, dir_arg};

#[derive(ClapArgs)]
pub struct Args {
    /// Target directory within the share (`/` for the root)
    pub dir: String,

    /// Local file to upload, or `-` for stdin
    pub source: String,

    /// Name inside the share (defaults to the local file name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Comment stored alongside the checksum
    #[arg(short, long)]
    pub comment: Option<String>,
}

#[instrument(level = "info", name = "cmd::put", skip_all, fields(dir = %args.dir, source = %args.source))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    let dir = dir_arg(Some(&args.dir));

    let digest = if args.source == "-" {
        let stdin = io::stdin();
        session.ops.upload(
            dir,
            args.name.as_deref(),
            stdin.lock(),
            session.index,
            args.comment.as_deref(),
        )?
    } else {
        let source = Path::new(&args.source);
        let file = File::open(source)
            .with_context(|| format!("Failed to open local file: {}", source.display()))?;
        let name = match &args.name {
            Some(name) => Some(name.clone()),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        };
        session.ops.upload(
            dir,
            name.as_deref(),
            BufReader::new(file),
            session.index,
            args.comment.as_deref(),
        )?
    };

    println!("{digest}");
    Ok(())
}
