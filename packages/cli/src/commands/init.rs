use anyhow::Result;
use clap::Args;
use colored::Colorize;
use onlook_workspace::{WorkspaceConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Program view-source should launch (e.g. "code")
    #[arg(short, long)]
    pub editor: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = WorkspaceConfig {
        editor_command: args.editor,
        ..WorkspaceConfig::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!("  Sources: {}", config.extensions.join(", "));
    println!("  Ignored: {}", config.ignored_dirs.join(", "));
    Ok(())
}
