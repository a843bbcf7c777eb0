use anyhow::Result;
use clap::Args;
use colored::Colorize;
use onlook_workspace::Workspace;

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// List every oid per file
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn index(args: IndexArgs, cwd: &str) -> Result<()> {
    let root = super::project_root(cwd, &args.path);
    let workspace = Workspace::open(&root).await?;
    let registry = workspace.registry();

    println!("{}", "🔎 Indexing project...".bright_blue().bold());

    let files = registry.indexed_files().await;
    if files.is_empty() {
        println!("{}", "⚠️  No source files found".yellow());
        return Ok(());
    }

    let mut total = 0;
    for file in &files {
        let oids = registry.oids_in(file).await?;
        total += oids.len();
        let relative = file.strip_prefix(&root).unwrap_or(file);
        println!("  {} {} ({} elements)", "✓".green(), relative.display(), oids.len());
        if args.verbose {
            for oid in oids {
                println!("      {}", oid.dimmed());
            }
        }
    }

    println!();
    println!(
        "{} {} elements in {} files",
        "Indexed".green().bold(),
        total,
        files.len()
    );
    Ok(())
}
