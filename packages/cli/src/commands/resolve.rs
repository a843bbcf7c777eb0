use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use onlook_workspace::opener::goto_argument;
use onlook_workspace::Workspace;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Element oid
    pub oid: String,

    /// Project directory
    #[arg(short, long, default_value = ".")]
    pub path: String,
}

#[derive(Debug, Args)]
pub struct BlockArgs {
    /// Element oid
    pub oid: String,

    /// Project directory
    #[arg(short, long, default_value = ".")]
    pub path: String,
}

/// Prints the element's template node as JSON
pub async fn resolve(args: ResolveArgs, cwd: &str) -> Result<()> {
    let workspace = Workspace::open(super::project_root(cwd, &args.path)).await?;
    let node = workspace
        .get_template_node_by_id(&args.oid)
        .await?
        .ok_or_else(|| anyhow!("No element with oid {}", args.oid))?;
    println!("{}", serde_json::to_string_pretty(&node)?);
    Ok(())
}

/// Prints the element's source text
pub async fn block(args: BlockArgs, cwd: &str) -> Result<()> {
    let workspace = Workspace::open(super::project_root(cwd, &args.path)).await?;
    let location = workspace.registry().element_location(&args.oid).await?;
    let code = workspace.registry().code_block(&args.oid).await?;

    println!("{}", goto_argument(&location).dimmed());
    println!("{}", code);
    Ok(())
}
