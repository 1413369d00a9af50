use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use xshell::Shell;

mod commands;

#[derive(Parser)]
#[command(name = "xtask", about = "Development tasks for the skelarm workspace")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // every task runs from the workspace root
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .context("xtask must live inside the workspace")?;
    sh.change_dir(root);

    cli.command.run(&sh)
}
