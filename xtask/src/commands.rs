use anyhow::Result;
use clap::Subcommand;
use xshell::Shell;

pub mod bench;
pub mod ci;
pub mod common;
pub mod demos;
pub mod fmt;

#[derive(Subcommand)]
pub enum Command {
    /// Run the dynamics benchmarks
    Bench(bench::Bench),
    /// Run CI checks (fmt, clippy, test, demos). Runs all if no subcommand specified.
    Ci(ci::Ci),
    /// Check and simulate every configuration under demos/
    Demos(demos::Demos),
    /// Apply rustfmt to all files
    Fmt(fmt::Fmt),
    /// Run tests
    Test(test::Test),
}

impl Command {
    pub fn run(self, sh: &Shell) -> Result<()> {
        match self {
            Command::Bench(cmd) => cmd.run(sh),
            Command::Ci(cmd) => cmd.run(sh),
            Command::Demos(cmd) => cmd.run(sh),
            Command::Fmt(cmd) => cmd.run(sh),
            Command::Test(cmd) => cmd.run(sh),
        }
    }
}
