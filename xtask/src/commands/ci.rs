use anyhow::Result;
use clap::{Args, Subcommand};
use xshell::Shell;

use super::{common, demos::Demos};

#[derive(Args)]
pub struct Ci {
    #[command(subcommand)]
    command: Option<CiCommand>,
}

#[derive(Subcommand)]
pub enum CiCommand {
    /// Run cargo fmt check
    Fmt,
    /// Run cargo clippy
    Clippy,
    /// Run cargo test
    Test(TestArgs),
    /// Check and simulate the demo configurations
    Demos(Demos),
}

#[derive(Args, Default)]
pub struct TestArgs {
    /// Additional arguments to pass to cargo test
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Ci {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        match &self.command {
            Some(cmd) => cmd.run(sh),
            None => {
                CiCommand::Fmt.run(sh)?;
                CiCommand::Clippy.run(sh)?;
                CiCommand::Test(TestArgs::default()).run(sh)?;
                CiCommand::Demos(Demos::default()).run(sh)?;
                Ok(())
            }
        }
    }
}

impl CiCommand {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        match self {
            CiCommand::Fmt => common::run_fmt_check(sh),
            CiCommand::Clippy => common::run_clippy(sh),
            CiCommand::Test(test_args) => common::run_tests(sh, false, &test_args.args),
            CiCommand::Demos(demos) => demos.run(sh),
        }
    }
}
