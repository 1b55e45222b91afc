//! List the shares configured in the config file.
//!
//! # Examples
//!
//! ```bash
//! sharebox shares
//! sharebox shares --json
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use crate::config::{Config, config_path};
use crate::output::create_table;

#[derive(ClapArgs)]
pub struct Args {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ShareInfo<'a> {
    alias: &'a str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<&'a str>,
}

#[instrument(level = "info", name = "cmd::shares", skip_all)]
pub fn execute(config: &Config, args: &Args) -> Result<()> {
    let shares: Vec<ShareInfo<'_>> = config
        .list_share_aliases()
        .into_iter()
        .filter_map(|alias| {
            config.get_share(alias).map(|entry| ShareInfo {
                alias,
                path: entry.path.display().to_string(),
                seed: entry.seed.as_deref(),
            })
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shares)?);
        return Ok(());
    }

    if shares.is_empty() {
        let location = config_path()?;
        println!("No shares configured in {}", location.display());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Alias", "Path", "Seed"]);
    for share in &shares {
        table.add_row(vec![
            format!("@{}", share.alias),
            share.path.clone(),
            share.seed.unwrap_or("").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
