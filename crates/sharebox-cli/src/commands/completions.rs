//! Shell completion scripts.
//!
//! # Examples
//!
//! ```bash
//! eval "$(sharebox completions bash)"
//! sharebox completions fish > ~/.config/fish/completions/sharebox.fish
//! ```

use std::io;

use anyhow::Result;
use clap::{Args as ClapArgs, CommandFactory};
use clap_complete::{Shell, generate};

use crate::Cli;

#[derive(ClapArgs)]
pub struct Args {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn execute(args: &Args) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "sharebox", &mut io::stdout());
    Ok(())
}
