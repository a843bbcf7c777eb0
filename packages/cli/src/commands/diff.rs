use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use onlook_common::{CodeDiff, CodeDiffRequest};
use onlook_workspace::Workspace;
use std::fs;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// JSON file holding an array of code diff requests
    pub requests: String,

    /// Project directory
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Write the diffs to disk
    #[arg(short, long)]
    pub write: bool,

    /// Print diffs as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn diff(args: DiffArgs, cwd: &str) -> Result<()> {
    let content = fs::read_to_string(super::project_root(cwd, &args.requests))
        .with_context(|| format!("Cannot read {}", args.requests))?;
    let requests: Vec<CodeDiffRequest> =
        serde_json::from_str(&content).context("Invalid request file")?;

    let workspace = Workspace::open(super::project_root(cwd, &args.path)).await?;
    let diffs = workspace.get_code_diffs(&requests).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
    } else {
        for diff in &diffs {
            print_diff(diff);
        }
    }

    if args.write {
        workspace.get_and_write_code_diff(&requests, false).await?;
        println!(
            "✨ {} {} change(s) written",
            "Done".green().bold(),
            diffs.len()
        );
    }
    Ok(())
}

fn print_diff(diff: &CodeDiff) {
    println!("{}", diff.path.display().to_string().bright_white().bold());
    for line in diff.original.lines() {
        println!("{}", format!("- {}", line).red());
    }
    for line in diff.generated.lines() {
        println!("{}", format!("+ {}", line).green());
    }
    println!();
}
